//! Pulse timeline: how often a bus turns up, by five-minute bucket.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::MINUTES_PER_DAY;

use super::merge::ArrivalHistory;

/// Width of a timeline bucket in minutes.
pub const BUCKET_MINS: u32 = 5;

/// Smoothed bus count for one five-minute bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PulseDataPoint {
    /// Start of the bucket, minutes from midnight (0, 5, ..., 1435).
    pub minute_bucket: u32,
    /// Damped average number of buses seen in this bucket per day.
    pub score: f64,
    /// Too few days of history to trust the score.
    pub is_low_confidence: bool,
}

/// Compute the pulse timeline over every contributing history.
///
/// Histories for several (route, stop) pairs can be combined, e.g. every
/// route serving a trip. Days are counted as the union of logical dates
/// across all of them. Returns an empty list when there is no history at
/// all; callers show that as "no data".
///
/// Minutes above 1439 (buses due after midnight, recorded unwrapped) fall
/// outside the day's counters and are not counted.
pub fn compute_timeline<'a>(
    histories: impl IntoIterator<Item = &'a ArrivalHistory>,
    damping_factor: u32,
) -> Vec<PulseDataPoint> {
    let mut dates: BTreeSet<&str> = BTreeSet::new();
    let mut counts = vec![0u32; MINUTES_PER_DAY as usize];

    for history in histories {
        for (date, minutes) in history.iter() {
            dates.insert(date);
            for &m in minutes {
                if let Some(slot) = counts.get_mut(m as usize) {
                    *slot += 1;
                }
            }
        }
    }

    let total_days = dates.len() as u32;
    if total_days == 0 {
        return Vec::new();
    }

    let denominator = f64::from(total_days + damping_factor);
    let is_low_confidence = total_days < damping_factor;

    counts
        .chunks(BUCKET_MINS as usize)
        .enumerate()
        .map(|(i, window)| PulseDataPoint {
            minute_bucket: i as u32 * BUCKET_MINS,
            score: f64::from(window.iter().sum::<u32>()) / denominator,
            is_low_confidence,
        })
        .collect()
}
