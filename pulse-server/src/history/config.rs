//! Arrival history configuration.

use crate::domain::LOGICAL_DAY_OFFSET_HOURS;

/// Tuning parameters for merging and scoring arrival history.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Two sightings this many minutes apart or closer are the same bus.
    pub magnet_threshold_mins: u32,

    /// Added to the day count when averaging bucket counts, so thin
    /// history doesn't produce confident spikes. Also the minimum number
    /// of days before a bucket is considered trustworthy.
    pub damping_factor: u32,

    /// Hours after midnight at which a new logical day starts.
    pub day_offset_hours: i64,
}

impl HistoryConfig {
    /// Set the magnet threshold.
    pub fn with_magnet_threshold(mut self, mins: u32) -> Self {
        self.magnet_threshold_mins = mins;
        self
    }

    /// Set the damping factor.
    pub fn with_damping_factor(mut self, factor: u32) -> Self {
        self.damping_factor = factor;
        self
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            magnet_threshold_mins: 5,
            damping_factor: 3,
            day_offset_hours: LOGICAL_DAY_OFFSET_HOURS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HistoryConfig::default();
        assert_eq!(config.magnet_threshold_mins, 5);
        assert_eq!(config.damping_factor, 3);
        assert_eq!(config.day_offset_hours, 4);
    }

    #[test]
    fn builders() {
        let config = HistoryConfig::default()
            .with_magnet_threshold(2)
            .with_damping_factor(7);
        assert_eq!(config.magnet_threshold_mins, 2);
        assert_eq!(config.damping_factor, 7);
    }
}
