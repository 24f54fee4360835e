//! Caching layer for route definitions.
//!
//! Route stop sequences change rarely, while the planner asks for the same
//! handful of routes on every search. Successful lookups are cached with a
//! TTL; failures are never cached so a flaky provider is retried next time.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::domain::{RouteDetail, RouteId};
use crate::planner::{RouteDataSource, SourceError};

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            max_capacity: 1000,
        }
    }
}

/// Route source with caching.
///
/// Wraps any `RouteDataSource` and remembers successful route lookups.
pub struct CachedRouteSource<S> {
    source: S,
    routes: MokaCache<RouteId, Arc<RouteDetail>>,
}

impl<S: RouteDataSource> CachedRouteSource<S> {
    /// Create a new cached source.
    pub fn new(source: S, config: &CacheConfig) -> Self {
        let routes = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { source, routes }
    }

    /// Access the underlying source for operations that bypass cache.
    pub fn inner(&self) -> &S {
        &self.source
    }

    /// Get cache statistics.
    pub fn cache_entry_count(&self) -> u64 {
        self.routes.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_cache(&self) {
        self.routes.invalidate_all();
    }
}

impl<S: RouteDataSource> RouteDataSource for CachedRouteSource<S> {
    async fn get_route_detail(&self, route: &RouteId) -> Result<RouteDetail, SourceError> {
        if let Some(cached) = self.routes.get(route).await {
            return Ok(RouteDetail::clone(&cached));
        }

        let detail = self.source.get_route_detail(route).await?;
        debug!(route = %route, "Caching route detail");
        self.routes
            .insert(route.clone(), Arc::new(detail.clone()))
            .await;

        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RouteStop;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl RouteDataSource for CountingSource {
        async fn get_route_detail(&self, route: &RouteId) -> Result<RouteDetail, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::Timeout);
            }
            Ok(RouteDetail {
                route_id: route.clone(),
                route_name: format!("Route {route}"),
                direction_label: String::new(),
                outbound_stops: vec![RouteStop::named("A"), RouteStop::named("B")],
                inbound_stops: Vec::new(),
            })
        }
    }

    fn route(s: &str) -> RouteId {
        RouteId::parse(s).unwrap()
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(600));
        assert_eq!(config.max_capacity, 1000);
    }

    #[tokio::test]
    async fn second_lookup_is_cached() {
        let cached = CachedRouteSource::new(CountingSource::new(false), &CacheConfig::default());

        let first = cached.get_route_detail(&route("307")).await.unwrap();
        let second = cached.get_route_detail(&route("307")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);

        cached.get_route_detail(&route("12")).await.unwrap();
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cached = CachedRouteSource::new(CountingSource::new(true), &CacheConfig::default());

        assert!(cached.get_route_detail(&route("307")).await.is_err());
        assert!(cached.get_route_detail(&route("307")).await.is_err());
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let cached = CachedRouteSource::new(CountingSource::new(false), &CacheConfig::default());

        cached.get_route_detail(&route("307")).await.unwrap();
        cached.invalidate_cache();
        cached.get_route_detail(&route("307")).await.unwrap();

        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
    }
}
