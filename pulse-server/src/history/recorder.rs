//! Persisted arrival history.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::{
    ArrivalPrediction, RouteId, StopId, logical_date_key, logical_date_with_offset, minute_of_day,
};
use crate::store::{KeyValueStore, StoreError};

use super::config::HistoryConfig;
use super::merge::{ArrivalHistory, absolute_minutes, magnet_merge};
use super::timeline::{PulseDataPoint, compute_timeline};

/// Errors from reading or writing arrival history.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The underlying store failed
    #[error("history store error: {0}")]
    Store(#[from] StoreError),

    /// A stored history value could not be decoded
    #[error("history for {key} is corrupt: {message}")]
    Corrupt { key: String, message: String },
}

/// Store key for a (route, stop) history.
///
/// The pair is JSON-encoded so ids containing separators can't collide.
fn history_key(route: &RouteId, stop: &StopId) -> String {
    let pair = serde_json::json!([route.as_str(), stop.as_str()]);
    format!("history:{pair}")
}

/// Folds live predictions into the persisted arrival history.
///
/// Ingests for the same (route, stop) are serialized so interleaved
/// read-modify-write cycles can't lose updates; different keys never
/// wait on each other beyond a brief lookup of their lock.
pub struct HistoryRecorder {
    store: Arc<dyn KeyValueStore>,
    config: HistoryConfig,
    /// One entry per (route, stop) ever ingested. Never pruned; bounded by
    /// the size of the network.
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl HistoryRecorder {
    /// Create a recorder over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>, config: HistoryConfig) -> Self {
        Self {
            store,
            config,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .key_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Load the full history for a (route, stop) pair.
    pub fn load(&self, route: &RouteId, stop: &StopId) -> Result<ArrivalHistory, HistoryError> {
        self.load_key(&history_key(route, stop))
    }

    fn load_key(&self, key: &str) -> Result<ArrivalHistory, HistoryError> {
        match self.store.get(key)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| HistoryError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => Ok(ArrivalHistory::new()),
        }
    }

    /// Fold a batch of countdowns observed at `now` into the history.
    ///
    /// `etas` must be in feed order; the merge is order dependent.
    /// Returns the updated minute list for the logical day.
    pub fn ingest(
        &self,
        route: &RouteId,
        stop: &StopId,
        now: NaiveDateTime,
        etas: &[u32],
    ) -> Result<Vec<u32>, HistoryError> {
        let date = logical_date_key(logical_date_with_offset(now, self.config.day_offset_hours));
        let candidates = absolute_minutes(minute_of_day(now), etas);

        let key = history_key(route, stop);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut history = self.load_key(&key)?;
        let existing = history.day(&date).to_vec();
        let before = existing.len();
        let merged = magnet_merge(existing, candidates, self.config.magnet_threshold_mins);

        debug!(
            route = %route,
            stop = %stop,
            date = %date,
            before,
            after = merged.len(),
            "ingested arrivals"
        );

        history.set_day(date, merged.clone());
        let json = serde_json::to_string(&history).map_err(|e| HistoryError::Corrupt {
            key: key.clone(),
            message: e.to_string(),
        })?;
        self.store.set(&key, json)?;

        Ok(merged)
    }

    /// Fold one live prediction into the history.
    pub fn ingest_prediction(
        &self,
        prediction: &ArrivalPrediction,
        now: NaiveDateTime,
    ) -> Result<Vec<u32>, HistoryError> {
        self.ingest(
            &prediction.route_id,
            &prediction.stop_id,
            now,
            &prediction.eta_minutes,
        )
    }

    /// Pulse timeline over every given (route, stop) pair.
    ///
    /// Repeated pairs count once. Empty when none of them has any history.
    pub fn timeline(
        &self,
        keys: &[(RouteId, StopId)],
    ) -> Result<Vec<PulseDataPoint>, HistoryError> {
        let distinct: BTreeSet<_> = keys.iter().collect();
        let histories = distinct
            .into_iter()
            .map(|(route, stop)| self.load(route, stop))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(compute_timeline(&histories, self.config.damping_factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn route(s: &str) -> RouteId {
        RouteId::parse(s).unwrap()
    }

    fn stop(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn recorder() -> (Arc<MemoryStore>, HistoryRecorder) {
        let store = Arc::new(MemoryStore::new());
        let recorder = HistoryRecorder::new(store.clone(), HistoryConfig::default());
        (store, recorder)
    }

    #[test]
    fn ingest_into_empty_history() {
        let (_, rec) = recorder();
        let merged = rec.ingest(&route("1"), &stop("A"), at(2, 9, 58), &[2, 12]).unwrap();
        assert_eq!(merged, vec![600, 610]);
        assert_eq!(
            rec.load(&route("1"), &stop("A")).unwrap().day("2024-01-02"),
            &[600, 610]
        );
    }

    #[test]
    fn repeat_poll_folds_into_existing() {
        let (_, rec) = recorder();
        rec.ingest(&route("1"), &stop("A"), at(2, 9, 55), &[5]).unwrap();
        let merged = rec.ingest(&route("1"), &stop("A"), at(2, 9, 58), &[2]).unwrap();
        assert_eq!(merged, vec![600]);

        let again = rec.ingest(&route("1"), &stop("A"), at(2, 9, 58), &[2]).unwrap();
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn two_close_candidates_collapse_on_empty_history() {
        let (_, rec) = recorder();
        let merged = rec.ingest(&route("1"), &stop("A"), at(2, 9, 58), &[2, 3]).unwrap();
        assert_eq!(merged, vec![601]);
    }

    #[test]
    fn small_hours_go_to_previous_logical_day_with_wall_clock_minutes() {
        let (_, rec) = recorder();
        rec.ingest(&route("1"), &stop("A"), at(2, 1, 0), &[0]).unwrap();

        let history = rec.load(&route("1"), &stop("A")).unwrap();
        assert_eq!(history.day("2024-01-01"), &[60]);
        assert!(history.day("2024-01-02").is_empty());
    }

    #[test]
    fn keys_are_independent() {
        let (_, rec) = recorder();
        rec.ingest(&route("1"), &stop("A"), at(2, 10, 0), &[0]).unwrap();
        rec.ingest(&route("2"), &stop("A"), at(2, 10, 0), &[1]).unwrap();
        rec.ingest(&route("1"), &stop("B"), at(2, 10, 0), &[2]).unwrap();

        assert_eq!(rec.load(&route("1"), &stop("A")).unwrap().day("2024-01-02"), &[600]);
        assert_eq!(rec.load(&route("2"), &stop("A")).unwrap().day("2024-01-02"), &[601]);
        assert_eq!(rec.load(&route("1"), &stop("B")).unwrap().day("2024-01-02"), &[602]);
    }

    #[test]
    fn keys_with_separators_do_not_collide() {
        let (_, rec) = recorder();
        rec.ingest(&route("a:b"), &stop("c"), at(2, 10, 0), &[0]).unwrap();
        assert!(rec.load(&route("a"), &stop("b:c")).unwrap().is_empty());
    }

    #[test]
    fn ingest_prediction_uses_its_ids() {
        let (_, rec) = recorder();
        let prediction = ArrivalPrediction {
            route_id: route("7"),
            stop_id: stop("Z"),
            eta_minutes: vec![3],
        };
        rec.ingest_prediction(&prediction, at(2, 12, 0)).unwrap();
        assert_eq!(rec.load(&route("7"), &stop("Z")).unwrap().day("2024-01-02"), &[723]);
    }

    #[test]
    fn corrupt_value_is_reported() {
        let (store, rec) = recorder();
        store
            .set(&history_key(&route("1"), &stop("A")), "[not a map".to_string())
            .unwrap();
        let err = rec.ingest(&route("1"), &stop("A"), at(2, 10, 0), &[0]).unwrap_err();
        assert!(matches!(err, HistoryError::Corrupt { .. }));
    }

    #[test]
    fn timeline_across_routes() {
        let (_, rec) = recorder();
        rec.ingest(&route("1"), &stop("A"), at(1, 10, 0), &[0]).unwrap();
        rec.ingest(&route("2"), &stop("A"), at(2, 10, 0), &[1]).unwrap();

        let timeline = rec
            .timeline(&[(route("1"), stop("A")), (route("2"), stop("A"))])
            .unwrap();
        assert_eq!(timeline.len(), 288);
        // Two days, two sightings in bucket 600..605
        assert_eq!(timeline[120].score, 2.0 / 5.0);
        assert!(timeline[120].is_low_confidence);
    }

    #[test]
    fn repeated_keys_count_once() {
        let (_, rec) = recorder();
        rec.ingest(&route("1"), &stop("A"), at(2, 10, 0), &[0]).unwrap();

        let once = rec.timeline(&[(route("1"), stop("A"))]).unwrap();
        let twice = rec
            .timeline(&[(route("1"), stop("A")), (route("1"), stop("A"))])
            .unwrap();
        assert_eq!(once[120].score, 0.25);
        assert_eq!(twice, once);
    }

    #[test]
    fn timeline_without_history_is_empty() {
        let (_, rec) = recorder();
        assert!(rec.timeline(&[(route("1"), stop("A"))]).unwrap().is_empty());
        assert!(rec.timeline(&[]).unwrap().is_empty());
    }

    #[test]
    fn concurrent_ingests_on_one_key_lose_nothing() {
        let (_, rec) = recorder();
        let rec = Arc::new(rec);

        let handles: Vec<_> = (0..16u32)
            .map(|i| {
                let rec = Arc::clone(&rec);
                std::thread::spawn(move || {
                    // Each thread sees a distinct bus 20 minutes apart
                    rec.ingest(&route("1"), &stop("A"), at(2, 6, 0), &[i * 20])
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let history = rec.load(&route("1"), &stop("A")).unwrap();
        assert_eq!(history.day("2024-01-02").len(), 16);
    }
}
