//! Stop identity types.

use serde::{Deserialize, Serialize};

use super::{LocationId, StopId};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Create a coordinate pair, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }
}

/// A named physical bus stop post.
///
/// Names are not unique: one name usually covers a post per direction,
/// and several posts at the same spot share a [`LocationId`].
#[derive(Debug, Clone, PartialEq)]
pub struct StopIdentity {
    pub name: String,
    pub stop_id: StopId,
    pub location_id: LocationId,
    pub coordinates: Option<Coordinates>,
}
