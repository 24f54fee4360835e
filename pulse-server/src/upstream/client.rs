//! Transit provider HTTP client.
//!
//! Fetches route definitions and live arrivals as JSON and converts them to
//! domain types. Concurrency is capped with a semaphore so a planning burst
//! doesn't trip the provider's rate limit.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{ArrivalPrediction, RouteDetail, RouteId, StopId};
use crate::planner::{LiveArrivalSource, RouteDataSource, SourceError};

use super::types::{ArrivalsResponse, RouteResponse};

/// Default base URL for the transit provider.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8081";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Configuration for the transit client.
#[derive(Debug, Clone)]
pub struct TransitClientConfig {
    /// Base URL of the provider's API
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TransitClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 10,
        }
    }
}

impl TransitClientConfig {
    /// Set the provider base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Transit provider API client.
#[derive(Debug, Clone)]
pub struct TransitClient {
    http: reqwest::Client,
    base_url: Url,
    semaphore: Arc<Semaphore>,
}

impl TransitClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TransitClientConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = Url::parse(&config.base_url).map_err(|e| SourceError::Http {
            message: format!("invalid base URL {:?}: {e}", config.base_url),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SourceError::Http {
                message: format!("invalid base URL {:?}", config.base_url),
            });
        }

        Ok(Self {
            http,
            base_url,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// The base URL with `segments` appended, each percent-encoded.
    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET a path and return the body of a successful response.
    async fn get_text(&self, segments: &[&str], what: &str) -> Result<String, SourceError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| SourceError::Http {
                message: "Semaphore closed".to_string(),
            })?;

        let url = self.url_for(segments);
        debug!(url = %url, "Fetching from transit provider");

        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(what.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response.text().await?)
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Json {
        message: e.to_string(),
    })
}

impl RouteDataSource for TransitClient {
    async fn get_route_detail(&self, route: &RouteId) -> Result<RouteDetail, SourceError> {
        let body = self
            .get_text(&["routes", route.as_str()], &format!("route {route}"))
            .await?;
        parse_body::<RouteResponse>(&body)?.into_domain()
    }
}

impl LiveArrivalSource for TransitClient {
    async fn fetch_arrivals_at_stop(
        &self,
        stop: &StopId,
    ) -> Result<Vec<ArrivalPrediction>, SourceError> {
        let body = self
            .get_text(
                &["stops", stop.as_str(), "arrivals"],
                &format!("stop {stop}"),
            )
            .await?;
        parse_body::<ArrivalsResponse>(&body)?.into_domain(stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;

    #[test]
    fn config_builder() {
        let config = TransitClientConfig::default()
            .with_base_url("http://localhost:9000")
            .with_max_concurrent(2)
            .with_timeout(5);

        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn config_defaults() {
        let config = TransitClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.timeout_secs, 10);
    }

    /// Serve a tiny fake provider on an ephemeral port.
    async fn fake_provider() -> String {
        let app = Router::new()
            .route(
                "/routes/:id",
                get(|Path(id): Path<String>| async move {
                    match id.as_str() {
                        "307" => (
                            StatusCode::OK,
                            r#"{"routeId": "307", "outboundStops": [{"name": "A"}, {"name": "B"}]}"#
                                .to_string(),
                        ),
                        "a/b c?" => (
                            StatusCode::OK,
                            r#"{"routeId": "a/b c?", "outboundStops": [{"name": "A"}]}"#
                                .to_string(),
                        ),
                        "bad" => (StatusCode::OK, "not json".to_string()),
                        "down" => (StatusCode::SERVICE_UNAVAILABLE, "maintenance".to_string()),
                        _ => (StatusCode::NOT_FOUND, String::new()),
                    }
                }),
            )
            .route(
                "/stops/:sid/arrivals",
                get(|| async { r#"{"arrivals": [{"routeId": "307", "etaMinutes": [4]}]}"# }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    async fn client() -> TransitClient {
        let base = fake_provider().await;
        TransitClient::new(TransitClientConfig::default().with_base_url(base)).unwrap()
    }

    fn route(s: &str) -> RouteId {
        RouteId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn fetches_route_detail() {
        let client = client().await;
        let detail = client.get_route_detail(&route("307")).await.unwrap();
        assert_eq!(detail.route_name, "307");
        assert_eq!(detail.outbound_stops.len(), 2);
    }

    #[tokio::test]
    async fn maps_error_statuses() {
        let client = client().await;
        assert!(matches!(
            client.get_route_detail(&route("999")).await,
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            client.get_route_detail(&route("down")).await,
            Err(SourceError::Api { status: 503, .. })
        ));
        assert!(matches!(
            client.get_route_detail(&route("bad")).await,
            Err(SourceError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn fetches_arrivals_tagged_with_stop() {
        let client = client().await;
        let stop = StopId::parse("1001").unwrap();
        let predictions = client.fetch_arrivals_at_stop(&stop).await.unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].stop_id, stop);
        assert_eq!(predictions[0].soonest(), Some(4));
    }

    #[tokio::test]
    async fn ids_are_encoded_as_one_path_segment() {
        let client = client().await;
        let detail = client.get_route_detail(&route("a/b c?")).await.unwrap();
        assert_eq!(detail.route_id, route("a/b c?"));

        let url = client.url_for(&["stops", "x/y?z", "arrivals"]);
        assert_eq!(url.path(), "/stops/x%2Fy%3Fz/arrivals");
    }

    #[test]
    fn base_url_path_is_kept() {
        let client =
            TransitClient::new(TransitClientConfig::default().with_base_url("http://host/api/"))
                .unwrap();
        assert_eq!(client.url_for(&["routes", "7"]).as_str(), "http://host/api/routes/7");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            TransitClient::new(TransitClientConfig::default().with_base_url("not a url")),
            Err(SourceError::Http { .. })
        ));
    }
}
