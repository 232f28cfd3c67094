//! Control systems for line following
//!
//! Provides the fixed-point line PID, discrete turn maneuvers, the blocking
//! control loop runner and the [`LineFollower`] that ties one cycle together.

mod control_loop;
mod follower;
mod maneuver;
mod motion;
mod pid;

pub use control_loop::{ControlLoop, ControlLoopConfig, ControlLoopStats};
pub use follower::{CycleReport, LineFollower};
pub use maneuver::{execute_turn, TurnConfig};
pub use motion::MotionController;
pub use pid::{
    AccumulatorWidth, ControlState, IntegralConfig, LinePid, LinePidConfig, PidTerms, WheelPowers,
};
