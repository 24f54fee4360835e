//! Server configuration from environment variables.

use std::fmt::{Debug, Display};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Top-level settings for the server binary.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// `PULSE_BIND_ADDR`
    pub bind_addr: SocketAddr,
    /// `PULSE_STOPS_FILE`: the static stop reference table
    pub stops_file: PathBuf,
    /// `PULSE_STORE_PATH`: JSON file for history and favorites
    pub store_path: PathBuf,
    /// `PULSE_UPSTREAM_URL`: transit provider base URL
    pub upstream_url: Option<String>,
    /// `PULSE_MOCK_DIR`: serve upstream data from JSON snapshots instead
    pub mock_dir: Option<PathBuf>,
    /// `PULSE_POLL_SECS`
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            stops_file: PathBuf::from("data/stops.json"),
            store_path: PathBuf::from("pulse_store.json"),
            upstream_url: None,
            mock_dir: None,
            poll_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    ///
    /// Unset variables take their defaults; unparseable ones are logged and
    /// also take their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_var(
            "PULSE_BIND_ADDR",
            non_empty("PULSE_BIND_ADDR"),
            defaults.bind_addr,
            SocketAddr::from_str,
        );
        let poll_secs = parse_var(
            "PULSE_POLL_SECS",
            non_empty("PULSE_POLL_SECS"),
            defaults.poll_interval.as_secs(),
            |s| match u64::from_str(s) {
                Ok(0) => Err("interval must be positive".to_string()),
                Ok(n) => Ok(n),
                Err(e) => Err(e.to_string()),
            },
        );

        Self {
            bind_addr,
            stops_file: non_empty("PULSE_STOPS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.stops_file),
            store_path: non_empty("PULSE_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            upstream_url: non_empty("PULSE_UPSTREAM_URL"),
            mock_dir: non_empty("PULSE_MOCK_DIR").map(PathBuf::from),
            poll_interval: Duration::from_secs(poll_secs),
        }
    }
}

fn parse_var<T, E>(
    name: &str,
    raw: Option<String>,
    default_value: T,
    parser: impl Fn(&str) -> Result<T, E>,
) -> T
where
    T: Debug,
    E: Display,
{
    let Some(raw) = raw else {
        return default_value;
    };
    match parser(raw.trim()) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                "Could not parse env var {} : {}. Using the default value '{:?}' instead",
                name, err, default_value
            );
            default_value
        }
    }
}
