//! Configuration management for the threat decision engine.
//! This module handles loading and managing configuration settings
//! from environment variables and configuration files.

mod settings;

pub use settings::{
    BlocklistConfig, DetectionConfig, IntelConfig, MetricsConfig, QueueConfig, RelayConfig,
    ServerConfig, Settings, StorageConfig,
};

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, config::ConfigError>;

/// Load the application configuration, falling back to defaults when the
/// environment is malformed. Configuration problems are logged, never fatal.
pub fn load_config() -> Settings {
    match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load configuration, using defaults");
            Settings::default()
        }
    }
}
