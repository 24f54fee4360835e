use std::sync::Arc;

use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pulse_server::cache::CacheConfig;
use pulse_server::config::ServerConfig;
use pulse_server::favorites::FavoriteRoutesStore;
use pulse_server::history::{HistoryConfig, HistoryRecorder};
use pulse_server::planner::PlannerConfig;
use pulse_server::poller::PollerConfig;
use pulse_server::stops::StopIndex;
use pulse_server::store::{FileStore, FileStoreConfig, KeyValueStore};
use pulse_server::upstream::{MockTransitSource, TransitClient, TransitClientConfig, Upstream};
use pulse_server::web::{AppState, create_router};

fn init_logger() {
    let default_level = LevelFilter::INFO;
    let rust_log =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_level.to_string());
    let env_filter = EnvFilter::try_new(rust_log).unwrap_or_else(|err| {
        eprintln!(
            "invalid {}, falling back to level '{}' - {}",
            EnvFilter::DEFAULT_ENV,
            default_level,
            err,
        );
        EnvFilter::new(default_level.to_string())
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let config = ServerConfig::from_env();

    // Bad reference data is fatal
    let stops = StopIndex::load_all(&config.stops_file).inspect_err(|e| {
        error!(path = %config.stops_file.display(), error = %e, "Failed to load stop table");
    })?;
    info!(stops = stops.len(), "Loaded stop table");

    let upstream = match &config.mock_dir {
        Some(dir) => {
            let mock = MockTransitSource::from_dir(dir)?;
            info!(dir = %dir.display(), routes = mock.route_count(), "Using mock transit data");
            Upstream::Mock(mock)
        }
        None => {
            let mut client_config = TransitClientConfig::default();
            if let Some(url) = &config.upstream_url {
                client_config = client_config.with_base_url(url);
            }
            info!(url = %client_config.base_url, "Using transit provider");
            Upstream::Http(TransitClient::new(client_config)?)
        }
    };

    let store: Arc<dyn KeyValueStore> =
        Arc::new(FileStore::open(FileStoreConfig::new(&config.store_path))?);
    info!(path = %config.store_path.display(), "Opened store");

    let state = AppState::new(
        stops,
        upstream,
        HistoryRecorder::new(Arc::clone(&store), HistoryConfig::default()),
        FavoriteRoutesStore::new(store),
        PlannerConfig::default(),
        &CacheConfig::default(),
        PollerConfig::default().with_interval(config.poll_interval),
    );

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Bus pulse server listening");
    info!("  GET    /health");
    info!("  GET    /api/stops/:name       - Resolve a stop name");
    info!("  GET    /api/arrivals/:name    - Live arrivals with direction");
    info!("  GET    /api/plan?from=&to=    - Plan bus routes");
    info!("  GET    /api/pulse?keys=       - Pulse timeline");
    info!("  POST   /api/watch             - Start polling a stop");
    info!("  *      /api/favorites         - Saved routes");

    axum::serve(listener, app).await?;
    Ok(())
}
