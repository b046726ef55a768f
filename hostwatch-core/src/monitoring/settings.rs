//! Runtime settings of the metrics sampler

use std::time::Duration;

/// Largest number of entries kept per history
pub const MAX_HISTORY_CAPACITY: usize = 3600;

/// How a [`super::MetricsSampler`] polls and when it gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    /// Time between ticks
    pub interval: Duration,
    /// Entries kept per history (1 to [`MAX_HISTORY_CAPACITY`])
    pub history_capacity: usize,
    /// Consecutive failed ticks before the session is marked `Error` (at least 1)
    pub failure_threshold: u32,
}

impl SamplerSettings {
    /// Creates settings, raising capacity and threshold to at least 1 and
    /// capping capacity at [`MAX_HISTORY_CAPACITY`]
    #[must_use]
    pub fn new(interval: Duration, history_capacity: usize, failure_threshold: u32) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            history_capacity: history_capacity.clamp(1, MAX_HISTORY_CAPACITY),
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Replaces the interval
    #[must_use]
    pub fn with_interval(self, interval: Duration) -> Self {
        Self::new(interval, self.history_capacity, self.failure_threshold)
    }
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), 10, 3)
    }
}
