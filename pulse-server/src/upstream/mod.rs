//! Transit provider access.
//!
//! Route definitions and live arrivals come either from the provider's HTTP
//! API or, for development, from JSON snapshots on disk. [`Upstream`] picks
//! one at startup so the rest of the server works with a single concrete
//! type.

mod client;
mod mock;
mod types;

pub use client::{TransitClient, TransitClientConfig};
pub use mock::{MockDataError, MockTransitSource};
pub use types::{ArrivalItem, ArrivalsResponse, RouteResponse, RouteStopItem};

use crate::domain::{ArrivalPrediction, RouteDetail, RouteId, StopId};
use crate::planner::{LiveArrivalSource, RouteDataSource, SourceError};

/// The configured transit data source.
#[derive(Debug, Clone)]
pub enum Upstream {
    Http(TransitClient),
    Mock(MockTransitSource),
}

impl RouteDataSource for Upstream {
    async fn get_route_detail(&self, route: &RouteId) -> Result<RouteDetail, SourceError> {
        match self {
            Upstream::Http(client) => client.get_route_detail(route).await,
            Upstream::Mock(mock) => mock.get_route_detail(route).await,
        }
    }
}

impl LiveArrivalSource for Upstream {
    async fn fetch_arrivals_at_stop(
        &self,
        stop: &StopId,
    ) -> Result<Vec<ArrivalPrediction>, SourceError> {
        match self {
            Upstream::Http(client) => client.fetch_arrivals_at_stop(stop).await,
            Upstream::Mock(mock) => mock.fetch_arrivals_at_stop(stop).await,
        }
    }
}
