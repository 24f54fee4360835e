//! Route definitions and planned-route results.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Coordinates, RouteId, StopId};

/// Travel direction along a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    /// Both directions, outbound first.
    pub const ALL: [Direction; 2] = [Direction::Outbound, Direction::Inbound];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => f.write_str("outbound"),
            Direction::Inbound => f.write_str("inbound"),
        }
    }
}

/// One stop on a route's direction-specific sequence.
///
/// Sequences are given by name. Some providers also say which post the
/// route uses; when present it pins the coordinates to that side of the road.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<StopId>,
}

impl RouteStop {
    /// A stop known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stop_id: None,
        }
    }
}

/// A bus line's definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDetail {
    pub route_id: RouteId,
    pub route_name: String,
    #[serde(default)]
    pub direction_label: String,
    #[serde(default)]
    pub outbound_stops: Vec<RouteStop>,
    #[serde(default)]
    pub inbound_stops: Vec<RouteStop>,
}

impl RouteDetail {
    /// The stop sequence for a direction.
    pub fn stops(&self, direction: Direction) -> &[RouteStop] {
        match direction {
            Direction::Outbound => &self.outbound_stops,
            Direction::Inbound => &self.inbound_stops,
        }
    }

    /// Find the segment from `from` to `to` in one direction.
    ///
    /// Uses the first occurrence of `from`, then the first occurrence of
    /// `to` after it. Later occurrences are never considered, even when
    /// they would give a shorter path on a loop route.
    pub fn find_segment(&self, direction: Direction, from: &str, to: &str) -> Option<(usize, usize)> {
        let stops = self.stops(direction);
        let i = stops.iter().position(|s| s.name == from)?;
        let j = stops[i + 1..].iter().position(|s| s.name == to)? + i + 1;
        Some((i, j))
    }

    /// Whether any stop in the direction has one of the given names.
    pub fn serves_any(&self, direction: Direction, names: &[&str]) -> bool {
        self.stops(direction)
            .iter()
            .any(|s| names.contains(&s.name.as_str()))
    }

    /// Human label for a direction: "To <terminus>", or the route-level
    /// label when the sequence is empty.
    pub fn direction_label_for(&self, direction: Direction) -> String {
        match self.stops(direction).last() {
            Some(terminus) => format!("To {}", terminus.name),
            None => self.direction_label.clone(),
        }
    }
}

/// A stop on a planned path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStop {
    pub name: String,
    pub coordinates: Option<Coordinates>,
}

/// One bus-route option between two named stops.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRoute {
    pub route_id: RouteId,
    pub route_name: String,
    pub direction: Direction,
    pub direction_label: String,
    /// Inclusive of origin and destination.
    pub path_stops: Vec<PathStop>,
    /// Stops travelled, i.e. `path_stops.len() - 1`.
    pub stop_count: usize,
    pub estimated_duration_minutes: u32,
    pub arrival_time_text: String,
}
