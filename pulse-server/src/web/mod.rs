//! Web layer for the bus pulse server.
//!
//! A JSON API over stop lookup, route planning, live arrivals, the pulse
//! timeline, arrival polling and saved routes.

mod dto;
mod routes;
mod state;


pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, RequestTracker};
