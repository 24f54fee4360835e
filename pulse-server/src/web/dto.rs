//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Coordinates, Direction, PlannedRoute, RouteId, StopId};
use crate::history::PulseDataPoint;

/// Resolved identity of a stop name.
#[derive(Debug, Serialize, Deserialize)]
pub struct StopLookupResponse {
    pub name: String,

    /// Every post registered under the name. Empty for unknown names.
    pub stop_ids: Vec<String>,

    /// One post per distinct location
    pub representative_stop_ids: Vec<String>,

    pub coordinates: Option<Coordinates>,
}

/// Request to plan routes between two stop names.
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub from: String,
    pub to: String,
}

/// Response for route planning.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub from: String,
    pub to: String,
    pub routes: Vec<PlannedRoute>,
    pub candidates_checked: usize,
    pub lookups_failed: usize,
}

/// One route's live countdowns at a stop post.
#[derive(Debug, Serialize, Deserialize)]
pub struct LiveArrival {
    pub route_id: String,
    pub route_name: Option<String>,
    pub stop_id: String,
    /// Which way the bus is heading, when the route definition says.
    pub direction: Option<Direction>,
    pub direction_label: Option<String>,
    pub eta_minutes: Vec<u32>,
    pub arrival_time_text: String,
}

/// Live arrivals at every location of a stop name.
#[derive(Debug, Serialize, Deserialize)]
pub struct LiveArrivalsResponse {
    pub name: String,
    pub arrivals: Vec<LiveArrival>,
    /// Number of stop posts whose feed failed.
    pub stops_failed: usize,
}

/// Request for a pulse timeline.
#[derive(Debug, Deserialize)]
pub struct PulseRequest {
    /// Comma-separated `route:stop` pairs.
    pub keys: String,
}

/// Parse `route:stop,route:stop` into id pairs.
///
/// The stop id is taken after the last colon, so route ids may contain
/// colons.
pub fn parse_pulse_keys(keys: &str) -> Result<Vec<(RouteId, StopId)>, String> {
    keys.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|key| {
            let (route, stop) = key
                .rsplit_once(':')
                .ok_or_else(|| format!("expected route:stop, got {key:?}"))?;
            let route = RouteId::parse(route).map_err(|e| format!("{e} in {key:?}"))?;
            let stop = StopId::parse(stop).map_err(|e| format!("{e} in {key:?}"))?;
            Ok((route, stop))
        })
        .collect()
}

/// Pulse timeline response.
#[derive(Debug, Serialize)]
pub struct PulseResponse {
    /// False when there is no history at all for the requested keys.
    pub has_data: bool,
    pub is_low_confidence: bool,
    pub timeline: Vec<PulseDataPoint>,
}

impl PulseResponse {
    pub fn new(timeline: Vec<PulseDataPoint>) -> Self {
        Self {
            has_data: !timeline.is_empty(),
            is_low_confidence: timeline.iter().any(|p| p.is_low_confidence),
            timeline,
        }
    }
}

/// Request to start polling a stop.
#[derive(Debug, Deserialize)]
pub struct WatchRequest {
    pub name: String,
}

/// Response after starting or stopping a watch.
#[derive(Debug, Serialize)]
pub struct WatchResponse {
    pub watching: Option<String>,
    pub generation: u64,
}

/// An (origin, destination) pair in a favorites request.
#[derive(Debug, Deserialize)]
pub struct FavoritePairRequest {
    pub origin: String,
    pub destination: String,
}

/// Request to pin or unpin a favorite.
#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub origin: String,
    pub destination: String,
    pub pinned: bool,
}

/// Response for a favorite removal.
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
