//! Route planner configuration.

/// Configuration parameters for route planning.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Minutes assumed per stop travelled when estimating duration.
    pub minutes_per_stop: u32,

    /// Maximum number of upstream requests issued at once.
    /// Higher values overlap more I/O but load the provider harder.
    pub batch_size: usize,
}

impl PlannerConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(minutes_per_stop: u32, batch_size: usize) -> Self {
        Self {
            minutes_per_stop,
            batch_size: batch_size.max(1),
        }
    }

    /// Estimated ride time for a number of stops travelled.
    pub fn estimate_minutes(&self, stop_count: usize) -> u32 {
        (stop_count as u32).saturating_mul(self.minutes_per_stop)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            minutes_per_stop: 2,
            batch_size: 8,
        }
    }
}
