use serde::Deserialize;

/// Configuration settings for the threat decision engine.
///
/// Every key has a default; a missing or partially configured environment is
/// a degrade-gracefully condition, never a startup failure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Preferred queue backend configuration
    pub queue: QueueConfig,
    /// Verdict storage configuration
    pub storage: StorageConfig,
    /// Downstream relay configuration
    pub relay: RelayConfig,
    /// Blocklist configuration
    pub blocklist: BlocklistConfig,
    /// Detection thresholds
    pub detection: DetectionConfig,
    /// External intelligence configuration
    pub intel: IntelConfig,
    /// Metrics exporter configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server configuration settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind the server to
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

/// Preferred queue backend settings
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Redis connection URL
    pub url: String,
    /// List key holding queued verdict records
    pub key: String,
    /// Bound on the startup connection probe
    pub connect_timeout_secs: u64,
}

/// Verdict storage settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// MongoDB connection string; storage is disabled when unset
    #[serde(default)]
    pub uri: Option<String>,
    pub database: String,
    pub collection: String,
}

/// Downstream relay settings
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Collector endpoint receiving verdict batches
    pub url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Blocklist settings
#[derive(Debug, Clone, Deserialize)]
pub struct BlocklistConfig {
    /// How long a blocked address stays blocked
    pub duration_secs: u64,
}

/// Thresholds for the rate-based detection rules
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    pub flood_threshold: usize,
    pub flood_window_secs: u64,
    pub login_threshold: usize,
    pub login_window_secs: u64,
    pub scan_threshold: usize,
    pub scan_window_secs: u64,
}

/// External intelligence settings
#[derive(Debug, Clone, Deserialize)]
pub struct IntelConfig {
    /// Reputation feed base URL; lookups are disabled when unset
    #[serde(default)]
    pub reputation_url: Option<String>,
    /// Traffic model endpoint; scoring is disabled when unset
    #[serde(default)]
    pub scorer_url: Option<String>,
    /// Per-lookup timeout in seconds
    pub timeout_secs: u64,
}

/// Metrics exporter settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus listen address (e.g. "127.0.0.1:9000"); disabled when unset
    #[serde(default)]
    pub listen: Option<String>,
}

impl Settings {
    /// Load configuration from environment variables, falling back to the
    /// documented defaults for anything unset.
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("queue.url", "redis://localhost:6379")?
            .set_default("queue.key", "attack_logs_queue")?
            .set_default("queue.connect_timeout_secs", 2)?
            .set_default("storage.database", "threat_engine")?
            .set_default("storage.collection", "attack_logs")?
            .set_default("relay.url", "http://localhost:3000/api/logs/ingest")?
            .set_default("relay.timeout_secs", 5)?
            .set_default("blocklist.duration_secs", 600)?
            .set_default("detection.flood_threshold", 200)?
            .set_default("detection.flood_window_secs", 10)?
            .set_default("detection.login_threshold", 10)?
            .set_default("detection.login_window_secs", 60)?
            .set_default("detection.scan_threshold", 20)?
            .set_default("detection.scan_window_secs", 60)?
            .set_default("intel.timeout_secs", 2)?
            // Environment variables with prefix "APP", nested keys separated
            // by "__" (e.g. APP__RELAY__URL).
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}

/// Default values for configuration settings
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            queue: QueueConfig {
                url: "redis://localhost:6379".to_string(),
                key: "attack_logs_queue".to_string(),
                connect_timeout_secs: 2,
            },
            storage: StorageConfig {
                uri: None,
                database: "threat_engine".to_string(),
                collection: "attack_logs".to_string(),
            },
            relay: RelayConfig {
                url: "http://localhost:3000/api/logs/ingest".to_string(),
                timeout_secs: 5,
            },
            blocklist: BlocklistConfig { duration_secs: 600 },
            detection: DetectionConfig {
                flood_threshold: 200,
                flood_window_secs: 10,
                login_threshold: 10,
                login_window_secs: 60,
                scan_threshold: 20,
                scan_window_secs: 60,
            },
            intel: IntelConfig {
                reputation_url: None,
                scorer_url: None,
                timeout_secs: 2,
            },
            metrics: MetricsConfig { listen: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_cover_every_backend() {
        let settings = Settings::default();
        assert!(settings.storage.uri.is_none());
        assert!(settings.intel.reputation_url.is_none());
        assert!(settings.metrics.listen.is_none());
        assert_eq!(settings.blocklist.duration_secs, 600);
        assert_eq!(
            Duration::from_secs(settings.detection.flood_window_secs),
            Duration::from_secs(10)
        );
    }
}
