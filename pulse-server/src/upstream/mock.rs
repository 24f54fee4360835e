//! Mock transit source for development without provider access.
//!
//! Loads route definitions and arrival snapshots from JSON files and serves
//! them as if they were live API responses.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{ArrivalPrediction, RouteDetail, RouteId, StopId};
use crate::planner::{LiveArrivalSource, RouteDataSource, SourceError};

use super::types::{ArrivalsResponse, RouteResponse};

/// Error loading mock data.
#[derive(Debug, thiserror::Error)]
pub enum MockDataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Json { path: PathBuf, message: String },
}

/// Transit source that serves data from JSON files.
///
/// Expects a directory with `routes.json` (an array of route payloads) and
/// `arrivals.json` (stop id to arrivals payload). Stops missing from the
/// arrivals file report no buses rather than failing.
#[derive(Debug, Clone, Default)]
pub struct MockTransitSource {
    routes: HashMap<RouteId, RouteDetail>,
    arrivals: HashMap<StopId, Vec<ArrivalPrediction>>,
    latency: Duration,
}

impl MockTransitSource {
    /// Load mock data from a directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, MockDataError> {
        let dir = dir.as_ref();
        let routes = read(&dir.join("routes.json"))?;
        let arrivals = read(&dir.join("arrivals.json"))?;
        Self::from_json(&routes, &arrivals).map_err(|message| MockDataError::Json {
            path: dir.to_path_buf(),
            message,
        })
    }

    /// Build from JSON strings in the provider's wire format.
    pub fn from_json(routes: &str, arrivals: &str) -> Result<Self, String> {
        let routes: Vec<RouteResponse> = serde_json::from_str(routes).map_err(|e| e.to_string())?;
        let arrivals: HashMap<String, ArrivalsResponse> =
            serde_json::from_str(arrivals).map_err(|e| e.to_string())?;

        let mut source = Self::default();
        for route in routes {
            let detail = route.into_domain().map_err(|e| e.to_string())?;
            source.routes.insert(detail.route_id.clone(), detail);
        }
        for (sid, response) in arrivals {
            let sid = StopId::parse(&sid).map_err(|e| e.to_string())?;
            let predictions = response.into_domain(&sid).map_err(|e| e.to_string())?;
            source.arrivals.insert(sid, predictions);
        }

        Ok(source)
    }

    /// Delay every response by `latency`, like a slow provider.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn respond(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Number of routes loaded.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

fn read(path: &Path) -> Result<String, MockDataError> {
    std::fs::read_to_string(path).map_err(|source| MockDataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl RouteDataSource for MockTransitSource {
    async fn get_route_detail(&self, route: &RouteId) -> Result<RouteDetail, SourceError> {
        self.respond().await;
        self.routes
            .get(route)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("route {route}")))
    }
}

impl LiveArrivalSource for MockTransitSource {
    async fn fetch_arrivals_at_stop(
        &self,
        stop: &StopId,
    ) -> Result<Vec<ArrivalPrediction>, SourceError> {
        self.respond().await;
        Ok(self.arrivals.get(stop).cloned().unwrap_or_default())
    }
}
