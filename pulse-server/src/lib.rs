//! Bus pulse server.
//!
//! Plans bus routes between two named stops and folds repeatedly polled
//! arrival predictions into a per-stop history, read back as a "pulse"
//! timeline of how often buses turn up through the day.

pub mod cache;
pub mod config;
pub mod domain;
pub mod favorites;
pub mod history;
pub mod planner;
pub mod poller;
pub mod stops;
pub mod store;
pub mod upstream;
pub mod web;
