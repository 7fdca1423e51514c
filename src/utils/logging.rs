use std::env;
use tracing_subscriber::EnvFilter;

/// Initialize the logging system with the specified log level
pub fn init_logging() {
    // Get the log level from environment variable or default to INFO
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    // Create a custom environment filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // Initialize the subscriber with custom formatting. A second call (e.g.
    // from tests) would fail to install; ignore it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Create a new span for tracking request context
pub fn create_request_span(request_id: &str) -> tracing::Span {
    tracing::info_span!(
        "decision",
        request_id = %request_id,
        timestamp = %chrono::Utc::now()
    )
}

/// Log a classified attack
pub fn log_detection(ip: &str, attack_type: &str, status: &str) {
    tracing::warn!(
        ip = %ip,
        attack_type = %attack_type,
        status = %status,
        event = "attack_detected",
        timestamp = %chrono::Utc::now()
    );
}

/// Log a blocklist update
pub fn log_block_event(ip: &str, attack_type: &str, duration_secs: u64) {
    tracing::warn!(
        ip = %ip,
        attack_type = %attack_type,
        duration_secs = %duration_secs,
        event = "ip_blocked",
        timestamp = %chrono::Utc::now()
    );
}

/// Log an event against an optional backend (queue, storage, relay, intel)
pub fn log_backend_event(component: &str, event_type: &str, success: bool, details: Option<&str>) {
    if success {
        tracing::info!(
            component = %component,
            event_type = %event_type,
            details = ?details,
            timestamp = %chrono::Utc::now()
        );
    } else {
        tracing::error!(
            component = %component,
            event_type = %event_type,
            details = ?details,
            timestamp = %chrono::Utc::now()
        );
    }
}

/// Log the outcome of one delivery cycle
pub fn log_delivery(drained: usize, staged: usize, persisted: bool, forwarded: bool) {
    tracing::info!(
        drained = %drained,
        staged = %staged,
        persisted = %persisted,
        forwarded = %forwarded,
        event = "batch_delivered",
        timestamp = %chrono::Utc::now()
    );
}
