//! Calibration sweep
//!
//! Spins the robot right, then left, then right again over the track while
//! recording sensor samples, so every sensor passes over both the line and
//! the floor. The sweep runs for a fixed number of steps with no convergence
//! check.
//!
//! The track must cross the whole sensor span during the sweep. A sensor that
//! never sees the line keeps degenerate bounds (min >= max) and will always
//! read 0 afterwards; this is reported with a warning, not an error.

use serde::{Deserialize, Serialize};

use crate::hardware::{Clock, Drivetrain, MotorCommand, ReflectanceSensor};
use crate::sensors::{CalibrationBounds, EmitterMode, SensorArray};
use crate::{Error, Result};

/// Calibration sweep configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Number of sweep steps
    pub steps: u32,
    /// Wheel power while spinning
    pub spin_power: i16,
    /// Delay after each step in milliseconds
    pub step_delay_ms: u32,
    /// Emitter mode used for the calibration reads
    pub emitters: EmitterMode,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            steps: 80,
            spin_power: 90,
            step_delay_ms: 20,
            emitters: EmitterMode::On,
        }
    }
}

impl CalibrationConfig {
    /// Set the number of sweep steps
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    /// Set the spin power
    pub fn with_spin_power(mut self, power: i16) -> Self {
        self.spin_power = power;
        self
    }

    /// Total blocking time of the sweep in milliseconds (delays only)
    pub fn sweep_duration_ms(&self) -> u64 {
        self.steps as u64 * self.step_delay_ms as u64
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return Err(Error::Config("calibration needs at least one step".into()));
        }
        if self.spin_power <= 0 || self.spin_power > crate::hardware::MOTOR_LIMIT {
            return Err(Error::Config(format!(
                "calibration spin power {} must lie in (0, {}]",
                self.spin_power,
                crate::hardware::MOTOR_LIMIT
            )));
        }
        Ok(())
    }
}

/// Spin direction for one sweep step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SweepDirection {
    /// Spin right (left wheel forward)
    Right,
    /// Spin left (right wheel forward)
    Left,
}

impl SweepDirection {
    /// Direction of step `step` in a sweep of `total` steps
    ///
    /// The first and last quarter spin right, the middle half spins left.
    pub fn for_step(step: u32, total: u32) -> Self {
        if step < total / 4 || step >= total - total / 4 {
            Self::Right
        } else {
            Self::Left
        }
    }

    /// Motor command for this direction
    pub fn command(self, power: i16) -> MotorCommand {
        match self {
            Self::Right => MotorCommand::spin_right(power),
            Self::Left => MotorCommand::spin_left(power),
        }
    }
}

/// Runs the calibration sweep
#[derive(Debug, Clone, Copy, Default)]
pub struct Calibrator {
    config: CalibrationConfig,
}

impl Calibrator {
    /// Create a calibrator
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Sweep with the configured number of steps
    pub fn calibrate<S, D, C>(
        &self,
        sensors: &mut SensorArray<S>,
        drivetrain: &mut D,
        clock: &mut C,
    ) -> Result<CalibrationBounds>
    where
        S: ReflectanceSensor,
        D: Drivetrain,
        C: Clock,
    {
        self.calibrate_for(self.config.steps, sensors, drivetrain, clock)
    }

    /// Sweep for an explicit number of steps
    ///
    /// Blocks for `steps * step_delay_ms` plus read time, stops the motors
    /// when done and returns a copy of the learned bounds. Bounds accumulate
    /// on top of any earlier calibration of the same array.
    pub fn calibrate_for<S, D, C>(
        &self,
        steps: u32,
        sensors: &mut SensorArray<S>,
        drivetrain: &mut D,
        clock: &mut C,
    ) -> Result<CalibrationBounds>
    where
        S: ReflectanceSensor,
        D: Drivetrain,
        C: Clock,
    {
        tracing::info!(
            "Calibrating {} sensors over {} steps",
            sensors.num_sensors(),
            steps
        );

        let mut direction = None;
        for step in 0..steps {
            let next = SweepDirection::for_step(step, steps);
            if direction != Some(next) {
                tracing::debug!("calibration step {}: spinning {:?}", step, next);
                direction = Some(next);
            }
            drivetrain.set_motors(next.command(self.config.spin_power))?;
            sensors.calibrate(self.config.emitters);
            clock.delay_ms(self.config.step_delay_ms);
        }
        drivetrain.stop()?;

        let bounds = sensors.bounds().clone();
        for i in 0..bounds.len() {
            if bounds.is_degenerate(i) {
                tracing::warn!(
                    "sensor {} has degenerate calibration bounds (min {:?}, max {:?})",
                    i,
                    bounds.min(i),
                    bounds.max(i)
                );
            } else {
                tracing::debug!(
                    "sensor {} calibrated to [{:?}, {:?}]",
                    i,
                    bounds.min(i),
                    bounds.max(i)
                );
            }
        }
        tracing::info!(
            "Calibration complete ({} degenerate sensors)",
            bounds.degenerate_sensors().count()
        );

        Ok(bounds)
    }
}
