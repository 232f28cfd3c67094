//! The line follower: one object owning the whole control cycle

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::calibration::Calibrator;
use crate::config::RobotConfig;
use crate::hardware::{Clock, Drivetrain, ReflectanceSensor};
use crate::intersection::{ExitFlags, IntersectionClassifier};
use crate::policy::{decide, TurnAction};
use crate::sensors::{CalibrationBounds, EmitterMode, LinePosition, SensorArray};
use crate::{Error, Result};

use super::control_loop::{ControlLoopConfig, ControlLoopStats};
use super::motion::MotionController;
use super::pid::{ControlState, PidTerms, WheelPowers};

/// What happened during one control cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Exits seen in the first sample
    pub flags: ExitFlags,
    /// Turn chosen for those exits
    pub action: TurnAction,
    /// Whether the turn commanded a maneuver
    pub turned: bool,
    /// Line position from the second sample
    pub position: LinePosition,
    /// Wheel powers applied by the PID step
    pub powers: WheelPowers,
    /// PID terms of this cycle
    pub terms: PidTerms,
}

/// Line follower with left-hand-on-the-wall intersection handling
///
/// Each [`cycle`](Self::cycle) samples the array, classifies exits, picks and
/// executes a turn, samples again and applies the PID correction.
/// [`calibrate`](Self::calibrate) must run first.
pub struct LineFollower<S, D, C> {
    sensors: SensorArray<S>,
    drivetrain: D,
    clock: C,
    calibrator: Calibrator,
    classifier: IntersectionClassifier,
    motion: MotionController,
    emitters: EmitterMode,
    state: ControlState,
}

impl<S, D, C> LineFollower<S, D, C>
where
    S: ReflectanceSensor,
    D: Drivetrain,
    C: Clock,
{
    /// Build a follower from a validated configuration
    pub fn new(config: &RobotConfig, sensor: S, drivetrain: D, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sensors: SensorArray::new(sensor, config.sensors.clone())?,
            drivetrain,
            clock,
            calibrator: Calibrator::new(config.calibration)?,
            classifier: IntersectionClassifier::new(config.classifier)?,
            motion: MotionController::new(config.pid, config.turn)?,
            emitters: config.calibration.emitters,
            state: ControlState::default(),
        })
    }

    /// Run the calibration sweep
    pub fn calibrate(&mut self) -> Result<CalibrationBounds> {
        self.calibrator
            .calibrate(&mut self.sensors, &mut self.drivetrain, &mut self.clock)
    }

    /// Run one control cycle
    pub fn cycle(&mut self) -> Result<CycleReport> {
        if !self.sensors.is_calibrated() {
            return Err(Error::InvalidState(
                "sensors must be calibrated before following the line".into(),
            ));
        }

        let (reading, _) = self.sensors.read_line(self.emitters);
        let flags = self.classifier.classify(&reading);
        let action = decide(flags);
        let turned = self
            .motion
            .execute_turn(action, &mut self.drivetrain, &mut self.clock)?;

        let (_, position) = self.sensors.read_line(self.emitters);
        let (powers, terms) =
            self.motion
                .correct(position, &mut self.state, &mut self.drivetrain)?;

        Ok(CycleReport {
            flags,
            action,
            turned,
            position,
            powers,
            terms,
        })
    }

    /// Run cycles until `on_cycle` returns false or a cycle fails
    ///
    /// Cycles are timed, and paced when `config.rate_hz` is set, through the
    /// follower's own [`Clock`], so a simulated clock advances simulated time
    /// instead of sleeping. Timing resolution is one millisecond.
    pub fn run<F>(&mut self, config: ControlLoopConfig, mut on_cycle: F) -> Result<ControlLoopStats>
    where
        F: FnMut(u64, &CycleReport) -> bool,
    {
        config.validate()?;
        tracing::info!("{}: following line", config.name);

        let period = config.period();
        let mut stats = ControlLoopStats::default();
        let mut iteration = 0u64;

        loop {
            let start_ms = self.clock.elapsed_ms();
            let report = self.cycle()?;
            let should_continue = on_cycle(iteration, &report);

            let execution_time =
                Duration::from_millis(self.clock.elapsed_ms().saturating_sub(start_ms));
            stats.update(execution_time, period);

            if !should_continue {
                break;
            }

            if let Some(period) = period {
                if let Some(remaining) = period.checked_sub(execution_time) {
                    let remaining_ms = u32::try_from(remaining.as_millis()).unwrap_or(u32::MAX);
                    if remaining_ms > 0 {
                        self.clock.delay_ms(remaining_ms);
                    }
                } else if config.warn_on_overrun {
                    tracing::warn!(
                        "{}: cycle overrun by {:?}",
                        config.name,
                        execution_time - period
                    );
                }
            }

            iteration += 1;
        }

        tracing::debug!(
            "{}: stopped after {} cycles (avg {:?})",
            config.name,
            stats.iterations,
            stats.avg_iteration_time()
        );
        Ok(stats)
    }

    /// Stop both wheels
    pub fn stop(&mut self) -> Result<()> {
        self.drivetrain.stop()
    }

    /// Controller memory
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Clear the controller memory
    pub fn reset_state(&mut self) {
        self.state.reset();
    }

    /// The sensor array
    pub fn sensors(&self) -> &SensorArray<S> {
        &self.sensors
    }

    /// Mutable access to the sensor array (e.g. to restore bounds)
    pub fn sensors_mut(&mut self) -> &mut SensorArray<S> {
        &mut self.sensors
    }

    /// The drivetrain
    pub fn drivetrain(&self) -> &D {
        &self.drivetrain
    }

    /// The clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The motion controller
    pub fn motion(&self) -> &MotionController {
        &self.motion
    }
}
