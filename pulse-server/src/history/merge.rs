//! Greedy magnet merge.
//!
//! The live feed re-reports the same physical bus on every poll, each time
//! with a slightly different countdown. Folding those repeats into one
//! sighting keeps the recorded frequency honest.
//!
//! The fold is greedy and order dependent: each candidate snaps to the
//! *first* entry within the threshold (not the closest), replacing it with
//! the newer reading. A candidate that matches nothing is appended, and
//! later candidates in the same batch may then snap to it. Two buses that
//! really do arrive within the threshold of each other are merged into one;
//! that is a known limitation of the heuristic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Turn relative countdowns into absolute minutes of day.
///
/// No wraparound: a bus due after midnight is recorded above 1439.
pub fn absolute_minutes(current_mod: u32, etas: &[u32]) -> Vec<u32> {
    etas.iter().map(|e| current_mod.saturating_add(*e)).collect()
}

/// Fold `candidates` into `existing`, in order, then sort and dedupe.
pub fn magnet_merge(
    mut existing: Vec<u32>,
    candidates: impl IntoIterator<Item = u32>,
    threshold: u32,
) -> Vec<u32> {
    for c in candidates {
        match existing.iter_mut().find(|m| m.abs_diff(c) <= threshold) {
            Some(m) => *m = c,
            None => existing.push(c),
        }
    }

    existing.sort_unstable();
    existing.dedup();
    existing
}

/// Observed arrivals for one (route, stop) pair, by logical date.
///
/// Serialized as a JSON object of `"YYYY-MM-DD"` → ascending minute list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrivalHistory {
    days: BTreeMap<String, Vec<u32>>,
}

impl ArrivalHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded minutes for a logical date (empty if none).
    pub fn day(&self, date_key: &str) -> &[u32] {
        self.days.get(date_key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Replace the recorded minutes for a logical date.
    pub fn set_day(&mut self, date_key: impl Into<String>, minutes: Vec<u32>) {
        self.days.insert(date_key.into(), minutes);
    }

    /// Logical dates with any record.
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.days.keys().map(String::as_str)
    }

    /// Every (date, minutes) pair.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.days.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
