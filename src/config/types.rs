//! Timing knobs for the scheduling cycle.

use std::time::Duration;

use super::ConfigError;

/// Timing configuration for a [`Scheduler`](crate::Scheduler).
///
/// Each kernel cycle spans `cycle_time`, split into an active window of
/// `cycle_time * up_ratio` and an idle remainder. Within the active
/// window, a single job is expected to requeue itself once it has run
/// for `up_time * burst_ratio` (the check is the job's responsibility,
/// via [`JobContext::timeout`](crate::JobContext::timeout)).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    cycle_time: Duration,
    up_ratio: f64,
    burst_ratio: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_time: Duration::from_millis(100),
            up_ratio: 0.8,
            burst_ratio: 0.5,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with the default timing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the full cycle length.
    pub fn with_cycle_time(mut self, cycle_time: Duration) -> Self {
        self.cycle_time = cycle_time;
        self
    }

    /// Set the fraction of the cycle spent processing jobs. Must be in
    /// `(0, 1]`.
    pub fn with_up_ratio(mut self, up_ratio: f64) -> Self {
        self.up_ratio = up_ratio;
        self
    }

    /// Set the fraction of the active window a single job may consume
    /// before [`timeout`](crate::JobContext::timeout) requeues it. Must
    /// be in `[0, 1]`; zero means every check yields.
    pub fn with_burst_ratio(mut self, burst_ratio: f64) -> Self {
        self.burst_ratio = burst_ratio;
        self
    }

    pub fn cycle_time(&self) -> Duration {
        self.cycle_time
    }

    pub fn up_ratio(&self) -> f64 {
        self.up_ratio
    }

    pub fn burst_ratio(&self) -> f64 {
        self.burst_ratio
    }

    /// The active window: `cycle_time * up_ratio`.
    pub fn up_time(&self) -> Duration {
        self.cycle_time.mul_f64(self.up_ratio)
    }

    /// A single job's cooperative budget: `up_time * burst_ratio`.
    pub fn burst_time(&self) -> Duration {
        self.up_time().mul_f64(self.burst_ratio)
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_time.is_zero() {
            return Err(ConfigError::Invalid(
                "cycle_time must be positive".to_string(),
            ));
        }
        if !(self.up_ratio > 0.0 && self.up_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "up_ratio must be in (0, 1], got {}",
                self.up_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.burst_ratio) {
            return Err(ConfigError::Invalid(format!(
                "burst_ratio must be in [0, 1], got {}",
                self.burst_ratio
            )));
        }
        Ok(())
    }
}
