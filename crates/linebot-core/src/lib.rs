//! linebot-core: Line following and intersection decisions for two-wheeled robots
//!
//! Drives a differential-drive robot along a dark (or light) line using an
//! array of reflectance sensors, and picks a turn at every junction with a
//! left-hand-on-the-wall rule.
//!
//! # Modules
//!
//! - [`hardware`] - Collaborator traits (sensors, drivetrain, clock) and mocks
//! - [`sensors`] - Sensor array, calibration bounds, line-position estimate
//! - [`calibration`] - Left/right sweep that learns the calibration bounds
//! - [`intersection`] - Threshold-based exit detection
//! - [`policy`] - Left-biased turn selection
//! - [`control`] - Fixed-point line PID, turn maneuvers, control loop
//! - [`config`] - Aggregated, serializable robot configuration
//! - [`sim`] - Kinematic line-track simulator
//!
//! # Control cycle
//!
//! ```text
//! ┌─────────┐   ┌────────────┐   ┌────────┐   ┌──────────┐   ┌─────────┐   ┌─────────┐
//! │ sensors │──►│ classifier │──►│ policy │──►│   turn   │──►│ sensors │──►│   PID   │
//! └─────────┘   └────────────┘   └────────┘   └──────────┘   └─────────┘   └─────────┘
//! ```
//!
//! Calibration runs once before the first cycle. Everything is
//! single-threaded; turn maneuvers and calibration steps block for a fixed
//! duration.

#![warn(unused_must_use)]

pub mod calibration;
pub mod config;
pub mod control;
pub mod hardware;
pub mod intersection;
pub mod policy;
pub mod sensors;
pub mod sim;

// Re-exports for convenience
pub use calibration::{CalibrationConfig, Calibrator, SweepDirection};
pub use config::RobotConfig;
pub use control::{
    ControlLoop, ControlLoopConfig, ControlLoopStats, ControlState, CycleReport, LineFollower,
    LinePid, LinePidConfig, MotionController, TurnConfig, WheelPowers,
};
pub use hardware::{Clock, Drivetrain, MotorCommand, ReflectanceSensor};
pub use intersection::{ClassifierConfig, ExitFlags, IntersectionClassifier};
pub use policy::{decide, TurnAction};
pub use sensors::{
    CalibrationBounds, EmitterMode, LineColor, LinePosition, SensorArray, SensorConfig,
    SensorReading,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for linebot-core
///
/// Only actuator commands, configuration and sequencing can fail. Sensor
/// reads, position estimates, exit classification, turn decisions and PID
/// steps always produce a value.
#[derive(Debug, thiserror::Error)]
#[must_use = "errors must be handled or explicitly ignored with let _ = ..."]
#[non_exhaustive]
pub enum Error {
    /// Hardware-level error from the motor driver.
    /// Handle by: stopping the motors and checking the driver connection.
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// Invalid configuration parameter.
    /// Handle by: validating config before use, checking parameter ranges.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Control loop execution error.
    /// Handle by: checking the cycle callback and loop rate.
    #[error("Control loop error: {0}")]
    ControlLoop(String),

    /// Operation attempted in invalid state (e.g., following before calibration).
    /// Handle by: running the startup sequence in order.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(format!("JSON error: {}", e))
    }
}

/// Result type alias for linebot-core operations
pub type Result<T> = std::result::Result<T, Error>;
