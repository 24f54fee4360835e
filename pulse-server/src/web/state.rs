//! Application state for the web layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::cache::{CacheConfig, CachedRouteSource};
use crate::favorites::FavoriteRoutesStore;
use crate::history::HistoryRecorder;
use crate::planner::PlannerConfig;
use crate::poller::{ArrivalPoller, Generation, PollerConfig};
use crate::stops::StopIndex;
use crate::upstream::Upstream;

/// Generation counters per (from, to) pair for "last request wins".
#[derive(Default)]
pub struct RequestTracker {
    pairs: Mutex<HashMap<(String, String), Arc<Generation>>>,
}

impl RequestTracker {
    /// Start a plan for `from` to `to`, superseding earlier ones for the
    /// same pair.
    pub fn begin(&self, from: &str, to: &str) -> (Arc<Generation>, u64) {
        let generation = {
            let mut pairs = self
                .pairs
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(
                pairs
                    .entry((from.to_string(), to.to_string()))
                    .or_default(),
            )
        };
        let ticket = generation.begin();
        (generation, ticket)
    }
}

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Stop identity index
    pub stops: Arc<StopIndex>,

    /// Route definitions, cached
    pub routes: Arc<CachedRouteSource<Upstream>>,

    /// Live arrivals
    pub arrivals: Arc<Upstream>,

    /// Arrival history
    pub history: Arc<HistoryRecorder>,

    /// Saved routes
    pub favorites: Arc<FavoriteRoutesStore>,

    /// Route planner configuration
    pub planner_config: Arc<PlannerConfig>,

    /// Plan request generations, per (from, to)
    pub plan_requests: Arc<RequestTracker>,

    /// Background arrival poller
    pub poller: Arc<ArrivalPoller<Upstream>>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        stops: StopIndex,
        upstream: Upstream,
        history: HistoryRecorder,
        favorites: FavoriteRoutesStore,
        planner_config: PlannerConfig,
        cache_config: &CacheConfig,
        poller_config: PollerConfig,
    ) -> Self {
        let stops = Arc::new(stops);
        let arrivals = Arc::new(upstream.clone());
        let history = Arc::new(history);
        let poller = ArrivalPoller::new(
            Arc::clone(&stops),
            Arc::clone(&arrivals),
            Arc::clone(&history),
            poller_config,
        );

        Self {
            stops,
            routes: Arc::new(CachedRouteSource::new(upstream, cache_config)),
            arrivals,
            history,
            favorites: Arc::new(favorites),
            planner_config: Arc::new(planner_config),
            plan_requests: Arc::new(RequestTracker::default()),
            poller: Arc::new(poller),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_supersedes_per_pair() {
        let tracker = RequestTracker::default();
        let (gen_ab, first) = tracker.begin("A", "B");
        let (gen_ba, other) = tracker.begin("B", "A");
        let (_, second) = tracker.begin("A", "B");

        assert!(!gen_ab.is_current(first));
        assert!(gen_ab.is_current(second));
        assert!(gen_ba.is_current(other));
    }
}
