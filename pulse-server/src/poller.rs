//! Periodic arrival polling.
//!
//! Watching a stop name starts a background task that polls the live
//! arrivals at each of its locations and folds them into the arrival
//! history. Starting a new watch supersedes the previous one: its
//! generation is no longer current, so any tick still in flight stops
//! before writing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDateTime;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::history::HistoryRecorder;
use crate::planner::LiveArrivalSource;
use crate::stops::StopIndex;

/// A monotonically increasing request counter.
///
/// Each new request takes a ticket; work holding an older ticket is stale
/// and must not publish its results.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

impl Generation {
    /// Create a counter at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding all earlier tickets.
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `ticket` is still the newest generation.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.0.load(Ordering::SeqCst) == ticket
    }

    /// The newest generation handed out.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Configuration for arrival polling.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between polls.
    pub interval: Duration,

    /// Maximum number of stops fetched at once.
    pub batch_size: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            batch_size: 8,
        }
    }
}

impl PollerConfig {
    /// Set the polling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// What one polling tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub stops_polled: usize,
    pub stops_failed: usize,
    pub predictions_ingested: usize,
    /// The tick was superseded and stopped early.
    pub superseded: bool,
}

/// The collaborators one polling tick reads from and writes to.
pub struct PollContext<'a, L: LiveArrivalSource> {
    pub stops: &'a StopIndex,
    pub source: &'a L,
    pub recorder: &'a HistoryRecorder,
    pub generation: &'a Generation,
    pub batch_size: usize,
}

/// Poll every location of `name` once and record what was seen.
///
/// Fetches run concurrently; ingestion follows stop order then feed order.
/// The tick stops as soon as `ticket` is no longer current.
pub async fn poll_tick<L: LiveArrivalSource>(
    ctx: &PollContext<'_, L>,
    ticket: u64,
    name: &str,
    now: NaiveDateTime,
) -> PollReport {
    let PollContext {
        stops,
        source,
        recorder,
        generation,
        batch_size,
    } = *ctx;
    let mut report = PollReport::default();
    let sids = stops.representative_sids(name);

    for batch in sids.chunks(batch_size.max(1)) {
        let futures: Vec<_> = batch
            .iter()
            .map(|sid| async move { (sid, source.fetch_arrivals_at_stop(sid).await) })
            .collect();
        let fetched = join_all(futures).await;

        for (sid, result) in fetched {
            report.stops_polled += 1;
            let predictions = match result {
                Ok(p) => p,
                Err(e) => {
                    warn!(stop = %sid, error = %e, "Failed to poll arrivals, skipping");
                    report.stops_failed += 1;
                    continue;
                }
            };

            for prediction in &predictions {
                if !generation.is_current(ticket) {
                    debug!(name, ticket, "Poll superseded");
                    report.superseded = true;
                    return report;
                }
                match recorder.ingest_prediction(prediction, now) {
                    Ok(_) => report.predictions_ingested += 1,
                    Err(e) => warn!(
                        route = %prediction.route_id,
                        stop = %prediction.stop_id,
                        error = %e,
                        "Failed to record arrivals"
                    ),
                }
            }
        }
    }

    report
}

/// Background poller for one watched stop name at a time.
pub struct ArrivalPoller<L> {
    stops: Arc<StopIndex>,
    source: Arc<L>,
    recorder: Arc<HistoryRecorder>,
    config: PollerConfig,
    generation: Arc<Generation>,
    task: Mutex<Option<(String, JoinHandle<()>)>>,
}

impl<L: LiveArrivalSource + 'static> ArrivalPoller<L> {
    /// Create an idle poller.
    pub fn new(
        stops: Arc<StopIndex>,
        source: Arc<L>,
        recorder: Arc<HistoryRecorder>,
        config: PollerConfig,
    ) -> Self {
        Self {
            stops,
            source,
            recorder,
            config,
            generation: Arc::new(Generation::new()),
            task: Mutex::new(None),
        }
    }

    /// Start polling `name`, cancelling any previous watch.
    ///
    /// Returns the generation of the new watch. Must be called from within
    /// a Tokio runtime.
    pub fn watch(&self, name: &str) -> u64 {
        // Held through the swap: the installed task is always the newest
        // generation's.
        let mut task = self.lock_task();
        let ticket = self.generation.begin();

        let stops = Arc::clone(&self.stops);
        let source = Arc::clone(&self.source);
        let recorder = Arc::clone(&self.recorder);
        let generation = Arc::clone(&self.generation);
        let config = self.config.clone();
        let watched = name.to_string();

        let handle = tokio::spawn(async move {
            let ctx = PollContext {
                stops: &stops,
                source: source.as_ref(),
                recorder: &recorder,
                generation: &generation,
                batch_size: config.batch_size,
            };
            let mut interval = tokio::time::interval(config.interval);
            loop {
                interval.tick().await;
                if !generation.is_current(ticket) {
                    break;
                }
                let now = chrono::Local::now().naive_local();
                let report = poll_tick(&ctx, ticket, &watched, now).await;
                debug!(
                    name = %watched,
                    polled = report.stops_polled,
                    failed = report.stops_failed,
                    ingested = report.predictions_ingested,
                    "Poll complete"
                );
                if report.superseded {
                    break;
                }
            }
        });

        info!(name, generation = ticket, "Watching stop");
        if let Some((old, handle)) = task.replace((name.to_string(), handle)) {
            debug!(name = %old, "Stopped previous watch");
            handle.abort();
        }
        ticket
    }

    /// Stop polling. Returns the name that was being watched, if any.
    pub fn stop(&self) -> Option<String> {
        let mut task = self.lock_task();
        self.generation.begin();
        let (name, handle) = task.take()?;
        handle.abort();
        info!(name = %name, "Stopped watching stop");
        Some(name)
    }

    /// The newest watch generation.
    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    /// The stop name currently watched.
    pub fn watching(&self) -> Option<String> {
        self.lock_task().as_ref().map(|(name, _)| name.clone())
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<(String, JoinHandle<()>)>> {
        self.task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<L> Drop for ArrivalPoller<L> {
    fn drop(&mut self) {
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((_, handle)) = task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArrivalPrediction, RouteId, StopId};
    use crate::history::HistoryConfig;
    use crate::planner::SourceError;
    use crate::stops::ReferenceTable;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;

    fn sid(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn route(s: &str) -> RouteId {
        RouteId::parse(s).unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn index() -> Arc<StopIndex> {
        let json = r#"{
            "stops": {
                "Main St": {
                    "1001": {"lat": 25.0, "lon": 121.0},
                    "1002": {"lat": 25.0, "lon": 121.0},
                    "1003": {"lat": 25.001, "lon": 121.001}
                },
                "High St": {"2001": {"lat": 25.1, "lon": 121.1}}
            },
            "locations": {"1001": "L1", "1002": "L1", "1003": "L2"}
        }"#;
        Arc::new(StopIndex::from_table(ReferenceTable::from_json(json).unwrap()).unwrap())
    }

    #[derive(Default)]
    struct FakeFeed {
        calls: AtomicUsize,
    }

    impl LiveArrivalSource for FakeFeed {
        async fn fetch_arrivals_at_stop(
            &self,
            stop: &StopId,
        ) -> Result<Vec<ArrivalPrediction>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match stop.as_str() {
                "1003" => Err(SourceError::Timeout),
                _ => Ok(vec![
                    ArrivalPrediction {
                        route_id: route("307"),
                        stop_id: stop.clone(),
                        eta_minutes: vec![2, 14],
                    },
                    ArrivalPrediction {
                        route_id: route("12"),
                        stop_id: stop.clone(),
                        eta_minutes: vec![5],
                    },
                ]),
            }
        }
    }

    fn recorder() -> Arc<HistoryRecorder> {
        Arc::new(HistoryRecorder::new(
            Arc::new(MemoryStore::new()),
            HistoryConfig::default(),
        ))
    }

    fn context<'a>(
        stops: &'a StopIndex,
        feed: &'a FakeFeed,
        recorder: &'a HistoryRecorder,
        generation: &'a Generation,
    ) -> PollContext<'a, FakeFeed> {
        PollContext {
            stops,
            source: feed,
            recorder,
            generation,
            batch_size: 8,
        }
    }

    #[test]
    fn generation_tickets() {
        let generation = Generation::new();
        let first = generation.begin();
        assert!(generation.is_current(first));

        let second = generation.begin();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
        assert_eq!(generation.current(), second);
    }

    #[tokio::test]
    async fn tick_ingests_each_location_once() {
        let stops = index();
        let feed = FakeFeed::default();
        let rec = recorder();
        let generation = Generation::new();
        let ticket = generation.begin();

        let ctx = context(&stops, &feed, &rec, &generation);
        let report = poll_tick(&ctx, ticket, "Main St", now()).await;

        assert_eq!(
            report,
            PollReport {
                stops_polled: 2,
                stops_failed: 1,
                predictions_ingested: 2,
                superseded: false,
            }
        );
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            rec.load(&route("307"), &sid("1001")).unwrap().day("2024-01-02"),
            &[602, 614]
        );
        assert_eq!(
            rec.load(&route("12"), &sid("1001")).unwrap().day("2024-01-02"),
            &[605]
        );
    }

    #[tokio::test]
    async fn stale_tick_writes_nothing() {
        let stops = index();
        let feed = FakeFeed::default();
        let rec = recorder();
        let generation = Generation::new();
        let stale = generation.begin();
        generation.begin();

        let ctx = context(&stops, &feed, &rec, &generation);
        let report = poll_tick(&ctx, stale, "Main St", now()).await;

        assert!(report.superseded);
        assert_eq!(report.predictions_ingested, 0);
        assert!(rec.load(&route("307"), &sid("1001")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_name_polls_nothing() {
        let stops = index();
        let feed = FakeFeed::default();
        let rec = recorder();
        let generation = Generation::new();
        let ticket = generation.begin();

        let ctx = context(&stops, &feed, &rec, &generation);
        let report = poll_tick(&ctx, ticket, "Nowhere", now()).await;
        assert_eq!(report, PollReport::default());
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn watch_replaces_previous_watch() {
        let config = PollerConfig::default().with_interval(Duration::from_secs(3600));
        let poller = ArrivalPoller::new(index(), Arc::new(FakeFeed::default()), recorder(), config);

        let first = poller.watch("Main St");
        let second = poller.watch("High St");
        assert!(second > first);
        assert_eq!(poller.watching().as_deref(), Some("High St"));

        assert_eq!(poller.stop().as_deref(), Some("High St"));
        assert_eq!(poller.watching(), None);
        assert_eq!(poller.stop(), None);
    }

    #[tokio::test]
    async fn watch_polls_immediately() {
        let config = PollerConfig::default().with_interval(Duration::from_secs(3600));
        let rec = recorder();
        let feed = Arc::new(FakeFeed::default());
        let poller = ArrivalPoller::new(index(), Arc::clone(&feed), Arc::clone(&rec), config);

        poller.watch("High St");
        for _ in 0..100 {
            if feed.calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
        poller.stop();
    }

    #[test]
    fn overlapping_watches_leave_newest_task_running() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        for _ in 0..300 {
            let config = PollerConfig::default().with_interval(Duration::from_secs(3600));
            let poller = Arc::new(ArrivalPoller::new(
                index(),
                Arc::new(FakeFeed::default()),
                recorder(),
                config,
            ));
            let barrier = Arc::new(std::sync::Barrier::new(2));

            let threads: Vec<_> = ["Main St", "High St"]
                .into_iter()
                .map(|name| {
                    let poller = Arc::clone(&poller);
                    let barrier = Arc::clone(&barrier);
                    let handle = runtime.handle().clone();
                    std::thread::spawn(move || {
                        let _entered = handle.enter();
                        barrier.wait();
                        poller.watch(name);
                    })
                })
                .collect();
            for t in threads {
                t.join().unwrap();
            }

            // Let a wrongly installed stale task notice and exit.
            std::thread::sleep(Duration::from_millis(2));

            let task = poller.lock_task();
            let (_, handle) = task.as_ref().unwrap();
            assert!(!handle.is_finished());
            drop(task);
            assert_eq!(poller.generation(), 2);
        }
    }
}
