//! Arrival history and pulse statistics.
//!
//! Live predictions are polled repeatedly and folded into a per-route,
//! per-stop, per-logical-day list of sightings with the greedy magnet
//! merge. The pulse timeline reads those lists back as a smoothed count
//! of buses per five-minute bucket.

mod config;
mod merge;
mod recorder;
mod timeline;

pub use config::HistoryConfig;
pub use merge::{ArrivalHistory, absolute_minutes, magnet_merge};
pub use recorder::{HistoryError, HistoryRecorder};
pub use timeline::{BUCKET_MINS, PulseDataPoint, compute_timeline};
