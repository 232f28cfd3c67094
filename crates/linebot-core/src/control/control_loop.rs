//! Blocking control loop runner
//!
//! Runs a cycle callback on the current thread until it asks to stop, with
//! optional fixed-rate pacing and timing statistics. There is no background
//! thread and no cancellation: the callback alone decides when to stop.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Configuration for a control loop
#[derive(Debug, Clone)]
pub struct ControlLoopConfig {
    /// Target loop rate in Hz; `None` runs cycles back to back
    pub rate_hz: Option<f64>,
    /// Name for logging/debugging
    pub name: Arc<str>,
    /// Whether to warn on timing overruns
    pub warn_on_overrun: bool,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            rate_hz: None,
            name: "line_follower".into(),
            warn_on_overrun: true,
        }
    }
}

impl ControlLoopConfig {
    /// A free-running loop
    pub fn free_running() -> Self {
        Self::default()
    }

    /// A loop paced at the given rate
    pub fn with_rate(rate_hz: f64) -> Self {
        Self {
            rate_hz: Some(rate_hz),
            ..Default::default()
        }
    }

    /// Set the loop name
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the target period, if paced
    pub fn period(&self) -> Option<Duration> {
        self.rate_hz.map(|hz| Duration::from_secs_f64(1.0 / hz))
    }

    /// Check that the loop rate, if any, is positive and finite
    pub fn validate(&self) -> Result<()> {
        match self.rate_hz {
            Some(hz) if !(hz.is_finite() && hz > 0.0) => Err(Error::ControlLoop(format!(
                "{}: loop rate must be positive and finite, got {}",
                self.name, hz
            ))),
            _ => Ok(()),
        }
    }
}

/// Statistics for a control loop
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlLoopStats {
    /// Number of completed iterations
    pub iterations: u64,
    /// Number of iterations that exceeded the target period
    pub overruns: u64,
    /// Total execution time
    pub total_execution_time: Duration,
    /// Maximum iteration time
    pub max_iteration_time: Duration,
    /// Minimum iteration time
    pub min_iteration_time: Duration,
    /// Last iteration time
    pub last_iteration_time: Duration,
}

impl ControlLoopStats {
    /// Fold one iteration into the statistics
    pub fn update(&mut self, execution_time: Duration, target_period: Option<Duration>) {
        self.iterations += 1;
        self.total_execution_time += execution_time;
        self.last_iteration_time = execution_time;

        if self.iterations == 1 {
            self.min_iteration_time = execution_time;
            self.max_iteration_time = execution_time;
        } else {
            self.min_iteration_time = self.min_iteration_time.min(execution_time);
            self.max_iteration_time = self.max_iteration_time.max(execution_time);
        }

        if matches!(target_period, Some(period) if execution_time > period) {
            self.overruns += 1;
        }
    }

    /// Average iteration time
    pub fn avg_iteration_time(&self) -> Duration {
        if self.iterations == 0 {
            Duration::ZERO
        } else {
            self.total_execution_time.div_f64(self.iterations as f64)
        }
    }

    /// Get the overrun ratio (0.0 to 1.0)
    pub fn overrun_ratio(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.overruns as f64 / self.iterations as f64
        }
    }

    /// Get the timing range (max - min iteration time)
    pub fn timing_range(&self) -> Duration {
        self.max_iteration_time
            .saturating_sub(self.min_iteration_time)
    }
}

/// A blocking control loop
///
/// # Example
/// ```
/// use linebot_core::control::{ControlLoop, ControlLoopConfig};
///
/// let stats = ControlLoop::run(ControlLoopConfig::free_running(), |iteration| {
///     // Control logic here
///     // Returns Ok(true) to continue, Ok(false) to stop
///     Ok(iteration < 9)
/// })?;
/// assert_eq!(stats.iterations, 10);
/// # Ok::<(), linebot_core::Error>(())
/// ```
pub struct ControlLoop;

impl ControlLoop {
    /// Run a control loop on the current thread
    ///
    /// Timing and pacing use the wall clock (`Instant` and
    /// `thread::sleep`). Loops driven by a simulated [`Clock`](crate::hardware::Clock)
    /// should use [`LineFollower::run`](super::LineFollower::run), which paces
    /// through the follower's own clock.
    ///
    /// The callback receives the iteration count and returns whether to
    /// continue. An error from the callback ends the loop and is returned.
    /// Every iteration that ran, including the last, is counted.
    pub fn run<F>(config: ControlLoopConfig, mut callback: F) -> Result<ControlLoopStats>
    where
        F: FnMut(u64) -> Result<bool>,
    {
        config.validate()?;
        let period = config.period();
        let mut stats = ControlLoopStats::default();
        let mut iteration = 0u64;

        loop {
            let loop_start = Instant::now();

            let should_continue = callback(iteration)?;

            let execution_time = loop_start.elapsed();
            stats.update(execution_time, period);

            if !should_continue {
                break;
            }

            if let Some(period) = period {
                if let Some(sleep_time) = period.checked_sub(execution_time) {
                    thread::sleep(sleep_time);
                } else if config.warn_on_overrun {
                    tracing::warn!(
                        "{}: loop overrun by {:?}",
                        config.name,
                        execution_time - period
                    );
                }
            }

            iteration += 1;
        }

        tracing::debug!(
            "{}: stopped after {} iterations (avg {:?})",
            config.name,
            stats.iterations,
            stats.avg_iteration_time()
        );
        Ok(stats)
    }

    /// Run a control loop for at most `duration` of wall-clock time
    pub fn run_for<F>(
        config: ControlLoopConfig,
        duration: Duration,
        mut callback: F,
    ) -> Result<ControlLoopStats>
    where
        F: FnMut(u64) -> Result<bool>,
    {
        let start = Instant::now();
        Self::run(config, |iter| {
            let keep_going = callback(iter)?;
            Ok(keep_going && start.elapsed() < duration)
        })
    }
}
