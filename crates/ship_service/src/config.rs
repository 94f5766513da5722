//! Service configuration, loaded from a JSON file named on the command line.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use aisstream::AisConfig;
use anyhow::Context;
use serde::Deserialize;

use crate::janitor::JanitorConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub janitor: JanitorConfig,
    pub aisstream: AisConfig,
    pub google: GoogleConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Address for the query API, e.g. "0.0.0.0:8080".
    pub listen_addr: String,
    /// Directory holding `templates/` and `static/`.
    pub html_dir: PathBuf,
    /// Optional Prometheus exporter address.
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
}

/// Ingest pipeline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Record route history for every ship.
    #[serde(default = "default_ship_history")]
    pub ship_history: bool,
    /// Seconds between spatial cache rebuilds.
    #[serde(default = "default_cache_refresh_secs")]
    pub cache_refresh_secs: u64,
}

/// Google Maps settings for the index page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleConfig {
    pub api_key: String,
}

fn default_worker_count() -> usize {
    10
}

fn default_ship_history() -> bool {
    true
}

fn default_cache_refresh_secs() -> u64 {
    5
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            ship_history: default_ship_history(),
            cache_refresh_secs: default_cache_refresh_secs(),
        }
    }
}

impl Config {
    /// Load and parse the config file. Any failure here is fatal.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("could not parse config file {}", path.display()))?;

        anyhow::ensure!(
            config.ingest.worker_count >= 1,
            "must have at least 1 ingest worker, config specifies {}",
            config.ingest.worker_count
        );
        anyhow::ensure!(
            config.ingest.cache_refresh_secs >= 1,
            "cache refresh interval must be at least 1 second"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"{
        "server": {
            "listenAddr": "127.0.0.1:8080",
            "htmlDir": "html",
            "metricsAddr": "127.0.0.1:9091"
        },
        "ingest": {
            "workerCount": 4,
            "shipHistory": false,
            "cacheRefreshSecs": 3
        },
        "janitor": {
            "enable": true,
            "scheduleHours": 12,
            "expiryDays": {"derelictShip": 14, "routeHistory": 3}
        },
        "aisstream": {
            "url": "wss://stream.aisstream.io/v0/stream",
            "apiKey": "secret",
            "defaultSub": {
                "boxes": [[[-90.0, -180.0], [90.0, 180.0]]],
                "filterMMSI": ["366000001"],
                "filterMsgType": ["PositionReport"]
            }
        },
        "google": {"apiKey": "maps-key"}
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config: Config = serde_json::from_str(FULL_CONFIG).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:8080");
        assert!(config.server.metrics_addr.is_some());
        assert_eq!(config.ingest.worker_count, 4);
        assert!(!config.ingest.ship_history);
        assert_eq!(config.janitor.schedule_hours, 12);
        assert_eq!(config.janitor.expiry_days.derelict_ship, 14);
        assert_eq!(config.aisstream.api_key, "secret");
        assert_eq!(config.aisstream.default_sub.filter_mmsi, vec!["366000001"]);
        assert_eq!(config.google.api_key, "maps-key");
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let raw = r#"{
            "server": {"listenAddr": ":8080", "htmlDir": "html"},
            "aisstream": {"url": "wss://example", "apiKey": "k"},
            "google": {"apiKey": "g"}
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.ingest.worker_count, 10);
        assert!(config.ingest.ship_history);
        assert_eq!(config.ingest.cache_refresh_secs, 5);
        assert!(config.janitor.enable);
        assert!(config.server.metrics_addr.is_none());
        assert!(config.aisstream.default_sub.boxes.is_empty());
    }
}
