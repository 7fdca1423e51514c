use std::sync::Arc;
use std::time::Duration;

use threat_decision_engine::api;
use threat_decision_engine::config::{load_config, DetectionConfig};
use threat_decision_engine::core::{Blocklist, Classifier, TrackerLimits};
use threat_decision_engine::engine::DecisionEngine;
use threat_decision_engine::intel;
use threat_decision_engine::queue::LogQueue;
use threat_decision_engine::relay::RelayClient;
use threat_decision_engine::storage::{MongoStore, VerdictStore};
use threat_decision_engine::utils::{init_logging, log_backend_event, EngineResult};
use threat_decision_engine::worker::DeliveryWorker;

fn tracker_limits(config: &DetectionConfig) -> TrackerLimits {
    TrackerLimits {
        flood_threshold: config.flood_threshold,
        flood_window: Duration::from_secs(config.flood_window_secs),
        login_threshold: config.login_threshold,
        login_window: Duration::from_secs(config.login_window_secs),
        scan_threshold: config.scan_threshold,
        scan_window: Duration::from_secs(config.scan_window_secs),
    }
}

#[tokio::main]
async fn main() -> EngineResult<()> {
    // Initialize logging
    init_logging();
    tracing::info!("Starting threat decision engine...");

    // Load configuration; a malformed environment degrades to defaults
    let settings = load_config();
    tracing::info!(
        host = %settings.server.host,
        port = %settings.server.port,
        "Configuration loaded"
    );

    // Optional Prometheus exporter
    if let Some(listen) = &settings.metrics.listen {
        match listen.parse::<std::net::SocketAddr>() {
            Ok(addr) => {
                let result = metrics_exporter_prometheus::PrometheusBuilder::new()
                    .with_http_listener(addr)
                    .install();
                match result {
                    Ok(()) => log_backend_event("metrics", "exporter_started", true, Some(listen)),
                    Err(e) => {
                        log_backend_event("metrics", "exporter_failed", false, Some(&e.to_string()))
                    }
                }
            }
            Err(e) => log_backend_event(
                "metrics",
                "invalid_listen_address",
                false,
                Some(&e.to_string()),
            ),
        }
    }

    // Shared enforcement state and the classifier around it
    let blocklist = Arc::new(Blocklist::new());
    let (reputation, scorer) = intel::from_config(&settings.intel);
    let classifier = Classifier::new(
        tracker_limits(&settings.detection),
        blocklist.clone(),
        reputation,
        scorer,
    );

    // Queue: probe the preferred backend once, then stay on whatever answered
    let queue = Arc::new(LogQueue::connect(&settings.queue).await);

    // Storage is optional; a failed connection leaves the engine storeless
    let store: Option<Arc<dyn VerdictStore>> = match &settings.storage.uri {
        Some(uri) => match MongoStore::connect(&settings.storage, uri).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                log_backend_event("storage", "connect_failed", false, Some(&e.to_string()));
                None
            }
        },
        None => {
            log_backend_event("storage", "not_configured", true, None);
            None
        }
    };

    let relay = RelayClient::new(&settings.relay)?;
    let engine = Arc::new(DecisionEngine::new(
        classifier,
        blocklist,
        queue.clone(),
        Duration::from_secs(settings.blocklist.duration_secs),
    ));

    // Background delivery loop; stopped between cycles on shutdown
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let worker = DeliveryWorker::new(queue, store, relay).spawn(shutdown_rx);

    api::serve(&settings.server, engine).await?;

    // Let the in-flight cycle finish before exiting
    let _ = shutdown_tx.send(true);
    let _ = worker.await;
    tracing::info!("Threat decision engine stopped");
    Ok(())
}
