//! Motion controller: discrete turns plus the continuous PID correction

use crate::hardware::{Clock, Drivetrain};
use crate::policy::TurnAction;
use crate::sensors::LinePosition;
use crate::Result;

use super::maneuver::{execute_turn, TurnConfig};
use super::pid::{ControlState, LinePid, LinePidConfig, PidTerms, WheelPowers};

/// Executes turn maneuvers and runs the line PID
#[derive(Debug, Clone, Copy)]
pub struct MotionController {
    pid: LinePid,
    turn: TurnConfig,
}

impl MotionController {
    /// Create a controller, validating both configurations
    pub fn new(pid: LinePidConfig, turn: TurnConfig) -> Result<Self> {
        turn.validate()?;
        Ok(Self {
            pid: LinePid::new(pid)?,
            turn,
        })
    }

    /// The PID controller
    pub fn pid(&self) -> &LinePid {
        &self.pid
    }

    /// The turn configuration
    pub fn turn_config(&self) -> &TurnConfig {
        &self.turn
    }

    /// Execute a discrete turn; see [`execute_turn`]
    pub fn execute_turn<D: Drivetrain, C: Clock>(
        &self,
        action: TurnAction,
        drivetrain: &mut D,
        clock: &mut C,
    ) -> Result<bool> {
        execute_turn(&self.turn, action, drivetrain, clock)
    }

    /// Compute wheel powers for a line position
    pub fn step_pid(&self, position: LinePosition, state: &mut ControlState) -> WheelPowers {
        self.pid.step(position, state)
    }

    /// Compute wheel powers and apply them to the drivetrain
    pub fn correct<D: Drivetrain>(
        &self,
        position: LinePosition,
        state: &mut ControlState,
        drivetrain: &mut D,
    ) -> Result<(WheelPowers, PidTerms)> {
        let (powers, terms) = self.pid.step_with_terms(position, state);
        drivetrain.set_motors(powers.into())?;
        Ok((powers, terms))
    }
}
