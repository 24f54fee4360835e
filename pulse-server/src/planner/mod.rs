//! Bus route planner.
//!
//! Answers "which buses go from this stop to that one?". Candidate routes
//! come from the live arrivals at the origin; each candidate's stop
//! sequences are checked in both directions for the origin followed by
//! the destination.

mod config;
mod search;
mod source;


pub use config::PlannerConfig;
pub use search::{Candidate, PlanResult, RoutePlanner};
pub use source::{LiveArrivalSource, RouteDataSource, SourceError};
