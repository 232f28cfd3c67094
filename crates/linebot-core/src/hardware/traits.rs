//! Hardware abstraction traits
//!
//! Defines the peripheral contracts the control core calls into: a bank of
//! reflectance sensors, a differential drivetrain and a blocking clock.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Largest magnitude accepted by a motor channel
pub const MOTOR_LIMIT: i16 = 255;

/// Differential motor command
///
/// Positive power drives a wheel forward, negative drives it backward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorCommand {
    /// Left wheel power
    pub left: i16,
    /// Right wheel power
    pub right: i16,
}

impl MotorCommand {
    /// Both wheels stopped
    pub const STOP: Self = Self { left: 0, right: 0 };

    /// Create a new motor command
    pub const fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    /// Spin in place to the right (left wheel forward, right wheel backward)
    pub const fn spin_right(power: i16) -> Self {
        Self::new(power, -power)
    }

    /// Spin in place to the left (left wheel backward, right wheel forward)
    pub const fn spin_left(power: i16) -> Self {
        Self::new(-power, power)
    }

    /// Clamp both channels to `[-MOTOR_LIMIT, MOTOR_LIMIT]`
    pub fn clamped(self) -> Self {
        Self {
            left: self.left.clamp(-MOTOR_LIMIT, MOTOR_LIMIT),
            right: self.right.clamp(-MOTOR_LIMIT, MOTOR_LIMIT),
        }
    }

    /// Difference between the wheels (left - right); positive turns right
    pub fn differential(&self) -> i32 {
        self.left as i32 - self.right as i32
    }
}

/// Bank of RC reflectance sensors
///
/// Each channel reports the time its capacitor took to discharge, in timer
/// ticks. Darker surfaces reflect less light and discharge more slowly, so
/// larger values mean "over the line". A read never fails: a channel that
/// does not discharge within `timeout_ticks` reports `timeout_ticks`.
pub trait ReflectanceSensor {
    /// Number of sensor channels
    fn num_channels(&self) -> usize;

    /// Switch the IR emitters on or off
    fn set_emitters(&mut self, on: bool);

    /// Measure the discharge time of every channel into `out`
    ///
    /// `out.len()` equals [`num_channels`](Self::num_channels).
    fn read_discharge(&mut self, timeout_ticks: u16, out: &mut [u16]);
}

/// Differential-drive motor output
pub trait Drivetrain {
    /// Apply a power command to both wheels
    fn set_motors(&mut self, command: MotorCommand) -> Result<()>;

    /// Stop both wheels
    fn stop(&mut self) -> Result<()> {
        self.set_motors(MotorCommand::STOP)
    }
}

/// Blocking time source
pub trait Clock {
    /// Block for the given number of milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Milliseconds elapsed since the clock was created
    fn elapsed_ms(&self) -> u64;
}

/// Wall-clock implementation backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Create a clock starting now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
