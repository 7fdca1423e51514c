//! HTTP front door: the decision endpoint and a liveness route.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::core::{DecisionRequest, Verdict};
use crate::engine::DecisionEngine;
use crate::utils::{create_request_span, EngineError, EngineResult};

/// Build the application router.
pub fn router(engine: Arc<DecisionEngine>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/security/decision", post(decide))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(10)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(engine)
}

/// Bind and serve until ctrl-c.
pub async fn serve(config: &ServerConfig, engine: Arc<DecisionEngine>) -> EngineResult<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| EngineError::Internal(format!("invalid listen address: {}", e)))?;

    tracing::info!(addr = %addr, "decision API listening");

    axum::Server::bind(&addr)
        .serve(router(engine).into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .map_err(|e| EngineError::Internal(e.to_string()))
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "Threat decision engine running" }))
}

async fn decide(
    State(engine): State<Arc<DecisionEngine>>,
    Json(request): Json<DecisionRequest>,
) -> Json<Verdict> {
    let span = create_request_span(&Uuid::new_v4().to_string());
    let verdict = engine.decide(request).instrument(span).await;
    Json(verdict)
}
