//! Fixed-point line-following PID
//!
//! Converts the line-position error into a pair of wheel powers. Gains are
//! integer divisors so the controller runs without floating point:
//!
//! ```text
//! power_diff = error / kp_div + integral / ki_div + derivative * kd_num / kd_div
//! ```
//!
//! The difference is clamped to `[-max_power, max_power]` and subtracted from
//! one wheel only, so neither wheel is ever commanded in reverse.

use serde::{Deserialize, Serialize};

use crate::sensors::LinePosition;
use crate::{Error, Result};

/// Bit width of the integral accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccumulatorWidth {
    /// 32-bit, saturating at `i32::MIN..=i32::MAX`
    #[default]
    Bits32,
    /// 64-bit, saturating at `i64::MIN..=i64::MAX`
    Bits64,
}

/// Integral accumulation policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegralConfig {
    /// Accumulator width
    pub width: AccumulatorWidth,
    /// Symmetric clamp on the accumulator (None for no clamp)
    pub limit: Option<i64>,
}

impl IntegralConfig {
    /// Unclamped accumulator of the given width
    pub fn unbounded(width: AccumulatorWidth) -> Self {
        Self { width, limit: None }
    }

    /// Clamp the accumulator to `[-limit, limit]`
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add `error` to `integral` under this policy
    pub fn accumulate(&self, integral: i64, error: i32) -> i64 {
        let sum = match self.width {
            AccumulatorWidth::Bits32 => {
                let narrowed = integral.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
                narrowed.saturating_add(error) as i64
            }
            AccumulatorWidth::Bits64 => integral.saturating_add(error as i64),
        };
        match self.limit {
            Some(limit) => sum.clamp(-limit, limit),
            None => sum,
        }
    }
}

/// Line PID configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinePidConfig {
    /// Position the controller steers toward
    pub setpoint: u16,
    /// Proportional divisor
    pub kp_div: i32,
    /// Integral divisor
    pub ki_div: i32,
    /// Derivative numerator
    pub kd_num: i32,
    /// Derivative denominator
    pub kd_div: i32,
    /// Full wheel power; also the clamp on the power difference
    pub max_power: i16,
    /// Integral accumulation policy
    pub integral: IntegralConfig,
}

impl Default for LinePidConfig {
    fn default() -> Self {
        Self {
            setpoint: 3500,
            kp_div: 20,
            ki_div: 10000,
            kd_num: 3,
            kd_div: 2,
            max_power: 165,
            integral: IntegralConfig::default(),
        }
    }
}

impl LinePidConfig {
    /// Set the gains
    pub fn with_gains(mut self, kp_div: i32, ki_div: i32, kd_num: i32, kd_div: i32) -> Self {
        self.kp_div = kp_div;
        self.ki_div = ki_div;
        self.kd_num = kd_num;
        self.kd_div = kd_div;
        self
    }

    /// Set the setpoint
    pub fn with_setpoint(mut self, setpoint: LinePosition) -> Self {
        self.setpoint = setpoint.value();
        self
    }

    /// Set full wheel power
    pub fn with_max_power(mut self, max_power: i16) -> Self {
        self.max_power = max_power;
        self
    }

    /// Set the integral policy
    pub fn with_integral(mut self, integral: IntegralConfig) -> Self {
        self.integral = integral;
        self
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.kp_div == 0 || self.ki_div == 0 || self.kd_div == 0 {
            return Err(Error::Config("PID divisors must be non-zero".into()));
        }
        if self.max_power <= 0 || self.max_power > crate::hardware::MOTOR_LIMIT {
            return Err(Error::Config(format!(
                "max power {} must lie in (0, {}]",
                self.max_power,
                crate::hardware::MOTOR_LIMIT
            )));
        }
        if let Some(limit) = self.integral.limit {
            if limit < 0 {
                return Err(Error::Config(format!(
                    "integral limit {} must be non-negative",
                    limit
                )));
            }
        }
        Ok(())
    }
}

/// Controller memory carried between cycles
///
/// Owned by the caller and passed into every step; the controller itself
/// holds no state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    /// Error from the previous step
    pub last_proportional: i32,
    /// Accumulated error
    pub integral: i64,
}

impl ControlState {
    /// Clear the accumulated history
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-wheel power, each in `[0, max_power]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelPowers {
    /// Left wheel power
    pub left: i16,
    /// Right wheel power
    pub right: i16,
}

impl WheelPowers {
    /// Create wheel powers
    pub const fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }
}

impl From<WheelPowers> for crate::hardware::MotorCommand {
    fn from(powers: WheelPowers) -> Self {
        Self::new(powers.left, powers.right)
    }
}

/// Terms of one controller step, for tuning and tracing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidTerms {
    /// Position error (position - setpoint)
    pub proportional: i32,
    /// Change in error since the previous step
    pub derivative: i32,
    /// Accumulated error after this step
    pub integral: i64,
    /// Clamped power difference (positive steers right)
    pub power_difference: i16,
}

/// Fixed-point line PID controller
///
/// # Example
/// ```
/// use linebot_core::control::{ControlState, LinePid, LinePidConfig, WheelPowers};
/// use linebot_core::sensors::LinePosition;
///
/// let pid = LinePid::new(LinePidConfig::default())?;
/// let mut state = ControlState::default();
///
/// let powers = pid.step(LinePosition::new(3500), &mut state);
/// assert_eq!(powers, WheelPowers::new(165, 165));
/// # Ok::<(), linebot_core::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LinePid {
    config: LinePidConfig,
}

impl LinePid {
    /// Create a controller, validating the configuration
    pub fn new(config: LinePidConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration
    pub fn config(&self) -> &LinePidConfig {
        &self.config
    }

    /// Run one step, updating `state` and returning the wheel powers
    #[inline]
    pub fn step(&self, position: LinePosition, state: &mut ControlState) -> WheelPowers {
        self.step_with_terms(position, state).0
    }

    /// Run one step and also return the individual terms
    pub fn step_with_terms(
        &self,
        position: LinePosition,
        state: &mut ControlState,
    ) -> (WheelPowers, PidTerms) {
        let cfg = &self.config;

        let proportional = position.value() as i32 - cfg.setpoint as i32;
        // `state` is caller-supplied, so every term saturates instead of overflowing
        let derivative = proportional.saturating_sub(state.last_proportional);
        state.integral = cfg.integral.accumulate(state.integral, proportional);
        state.last_proportional = proportional;

        // Integer division truncates toward zero on every term
        let p_term = (proportional as i64).saturating_div(cfg.kp_div as i64);
        let i_term = state.integral.saturating_div(cfg.ki_div as i64);
        let d_term = (derivative as i64 * cfg.kd_num as i64).saturating_div(cfg.kd_div as i64);
        let raw = p_term.saturating_add(i_term).saturating_add(d_term);

        let max = cfg.max_power as i64;
        let power_difference = raw.clamp(-max, max) as i16;

        let powers = if power_difference < 0 {
            WheelPowers::new(cfg.max_power + power_difference, cfg.max_power)
        } else {
            WheelPowers::new(cfg.max_power, cfg.max_power - power_difference)
        };

        let terms = PidTerms {
            proportional,
            derivative,
            integral: state.integral,
            power_difference,
        };
        tracing::trace!(?terms, ?powers, "pid step");

        (powers, terms)
    }
}
