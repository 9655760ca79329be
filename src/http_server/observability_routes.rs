//! Observability HTTP Routes
//!
//! Liveness and counters of the running bridge.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::observability::MetricsRegistry;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether the store has been created yet
    pub store_initialized: bool,
}

/// Shared state of the observability routes
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<MetricsRegistry>,
    pub store_initialized: Arc<dyn Fn() -> bool + Send + Sync>,
}

/// `/health` and `/metrics`
pub fn observability_routes(state: ObservabilityState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn health_handler(State(state): State<ObservabilityState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_initialized: (state.store_initialized)(),
    };

    (StatusCode::OK, Json(response))
}

/// Counters of the shared registry as JSON
async fn metrics_handler(State(state): State<ObservabilityState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.metrics.to_json()))
}
