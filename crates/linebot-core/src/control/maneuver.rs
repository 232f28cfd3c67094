//! Fixed-duration turn maneuvers

use serde::{Deserialize, Serialize};

use crate::hardware::{Clock, Drivetrain, MotorCommand, MOTOR_LIMIT};
use crate::policy::TurnAction;
use crate::{Error, Result};

/// Turn maneuver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Wheel power while spinning
    pub power: i16,
    /// How long the spin lasts, in milliseconds
    pub duration_ms: u32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            power: 90,
            duration_ms: 200,
        }
    }
}

impl TurnConfig {
    /// Set the spin power
    pub fn with_power(mut self, power: i16) -> Self {
        self.power = power;
        self
    }

    /// Set the spin duration
    pub fn with_duration_ms(mut self, duration_ms: u32) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Motor command for an action, or `None` if the action does not move
    ///
    /// `Through` keeps going on the line. `DeadEndReverse` has no recovery
    /// maneuver and is also `None`.
    pub fn command_for(&self, action: TurnAction) -> Option<MotorCommand> {
        match action {
            TurnAction::Left => Some(MotorCommand::spin_left(self.power)),
            TurnAction::Right => Some(MotorCommand::spin_right(self.power)),
            TurnAction::Through | TurnAction::DeadEndReverse => None,
        }
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.power <= 0 || self.power > MOTOR_LIMIT {
            return Err(Error::Config(format!(
                "turn power {} must lie in (0, {}]",
                self.power, MOTOR_LIMIT
            )));
        }
        Ok(())
    }
}

/// Execute a turn, blocking until the maneuver's duration has elapsed
///
/// The motors are left spinning when this returns; the next PID step
/// overwrites the command. Returns whether anything was commanded.
pub fn execute_turn<D, C>(
    config: &TurnConfig,
    action: TurnAction,
    drivetrain: &mut D,
    clock: &mut C,
) -> Result<bool>
where
    D: Drivetrain,
    C: Clock,
{
    match config.command_for(action) {
        Some(command) => {
            tracing::debug!("turning {} for {} ms", action, config.duration_ms);
            drivetrain.set_motors(command)?;
            clock.delay_ms(config.duration_ms);
            Ok(true)
        }
        None => {
            if action == TurnAction::DeadEndReverse {
                tracing::trace!("no exit seen; dead-end recovery is not implemented");
            }
            Ok(false)
        }
    }
}
