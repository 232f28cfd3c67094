//! Hardware abstraction for the robot's peripherals
//!
//! The control core only talks to hardware through the traits defined here,
//! so the same code runs against real drivers, the [`crate::sim`] world, or
//! the recording mocks used in tests.

mod mock;
mod traits;

pub use mock::{ManualClock, RecordingDrivetrain, ScriptedSensor};
pub use traits::{Clock, Drivetrain, MotorCommand, ReflectanceSensor, SystemClock, MOTOR_LIMIT};
