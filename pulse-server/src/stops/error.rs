//! Stop reference data error types.

use crate::domain::{InvalidId, StopId};

/// Structural problems with the static stop reference data.
///
/// All of these are fatal: an index built from bad data would hand out
/// silently wrong identifier mappings.
#[derive(Debug, thiserror::Error)]
pub enum StopIndexError {
    /// Reading the reference file failed
    #[error("failed to read stop reference data: {0}")]
    Io(#[from] std::io::Error),

    /// The reference data is not valid JSON of the expected shape
    #[error("stop reference data parse error: {message}")]
    Json { message: String },

    /// A stop entry lacks a latitude or longitude
    #[error("stop {stop_id} ({name}) is missing {field}")]
    MissingCoordinates {
        name: String,
        stop_id: String,
        field: &'static str,
    },

    /// A stop entry has coordinates outside the valid range
    #[error("stop {stop_id} has invalid coordinates ({lat}, {lon})")]
    InvalidCoordinates { stop_id: StopId, lat: f64, lon: f64 },

    /// The same stop id is listed under two different names
    #[error("stop {stop_id} is listed as both {first:?} and {second:?}")]
    ConflictingName {
        stop_id: StopId,
        first: String,
        second: String,
    },

    /// An identifier or name in the table is empty
    #[error("invalid identifier in stop reference data: {0}")]
    InvalidId(#[from] InvalidId),
}
