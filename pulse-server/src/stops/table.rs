//! Static stop reference table.
//!
//! The table is a JSON document of the shape
//!
//! ```json
//! {
//!   "stops": { "Main St": { "1001": { "lat": 25.04, "lon": 121.51 } } },
//!   "locations": { "1001": "L17" }
//! }
//! ```
//!
//! `stops` maps a display name to the posts registered under it, and
//! `locations` maps a post to the physical location it stands at. Posts
//! missing from `locations` are treated as their own location.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::domain::{Coordinates, LocationId, StopId, StopIdentity};

use super::error::StopIndexError;

/// Raw coordinates; both fields must be present after parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCoordinates {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// The reference table as it appears on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceTable {
    #[serde(default)]
    pub stops: BTreeMap<String, BTreeMap<String, RawCoordinates>>,
    #[serde(default)]
    pub locations: BTreeMap<String, String>,
}

/// Validated contents of a reference table.
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    /// One entry per post, ordered by name then stop id.
    pub identities: Vec<StopIdentity>,
    /// Every post → location mapping, including posts with no name entry.
    pub locations: BTreeMap<StopId, LocationId>,
}

impl ReferenceTable {
    /// Read a table from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StopIndexError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, StopIndexError> {
        serde_json::from_str(json).map_err(|e| StopIndexError::Json {
            message: e.to_string(),
        })
    }

    /// Validate the table into stop identities.
    pub fn parse(self) -> Result<ParsedTable, StopIndexError> {
        let mut locations = BTreeMap::new();
        for (sid, slid) in &self.locations {
            locations.insert(StopId::parse(sid)?, LocationId::parse(slid)?);
        }

        let mut seen: BTreeMap<StopId, String> = BTreeMap::new();
        let mut identities = Vec::new();

        for (name, posts) in self.stops {
            if name.trim().is_empty() {
                return Err(StopIndexError::Json {
                    message: "stop name cannot be empty".to_string(),
                });
            }

            for (raw_sid, raw) in posts {
                let lat = raw.lat.ok_or_else(|| StopIndexError::MissingCoordinates {
                    name: name.clone(),
                    stop_id: raw_sid.clone(),
                    field: "lat",
                })?;
                let lon = raw.lon.ok_or_else(|| StopIndexError::MissingCoordinates {
                    name: name.clone(),
                    stop_id: raw_sid.clone(),
                    field: "lon",
                })?;

                let stop_id = StopId::parse(&raw_sid)?;
                let coordinates = Coordinates::new(lat, lon).ok_or_else(|| {
                    StopIndexError::InvalidCoordinates {
                        stop_id: stop_id.clone(),
                        lat,
                        lon,
                    }
                })?;

                if let Some(first) = seen.get(&stop_id) {
                    return Err(StopIndexError::ConflictingName {
                        stop_id,
                        first: first.clone(),
                        second: name.clone(),
                    });
                }
                seen.insert(stop_id.clone(), name.clone());

                let location_id = match locations.get(&stop_id) {
                    Some(slid) => slid.clone(),
                    None => LocationId::parse(stop_id.as_str())?,
                };

                identities.push(StopIdentity {
                    name: name.clone(),
                    stop_id,
                    location_id,
                    coordinates: Some(coordinates),
                });
            }
        }

        Ok(ParsedTable {
            identities,
            locations,
        })
    }
}
