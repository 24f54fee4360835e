//! Upstream data sources the planner and poller consume.

use std::future::Future;

use crate::domain::{ArrivalPrediction, RouteDetail, RouteId, StopId};

/// Error from an upstream data source.
///
/// Callers treat every variant as "skip this unit of work": one failed
/// route or stop never aborts a whole planning or polling cycle.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// The request could not be completed (network, connection reset)
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// The provider answered with an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// The provider has no such route or stop
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider didn't answer in time
    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_decode() {
            SourceError::Json {
                message: err.to_string(),
            }
        } else {
            SourceError::Http {
                message: err.to_string(),
            }
        }
    }
}

/// Provides route definitions.
///
/// This abstraction allows the planner to be tested with mock data.
pub trait RouteDataSource: Send + Sync {
    /// Fetch the stop sequences of a route.
    fn get_route_detail(
        &self,
        route: &RouteId,
    ) -> impl Future<Output = Result<RouteDetail, SourceError>> + Send;
}

/// Provides live arrival predictions.
pub trait LiveArrivalSource: Send + Sync {
    /// Fetch current predictions for every route serving a stop post.
    fn fetch_arrivals_at_stop(
        &self,
        stop: &StopId,
    ) -> impl Future<Output = Result<Vec<ArrivalPrediction>, SourceError>> + Send;
}
