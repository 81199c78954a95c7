//! Health check endpoint.
//!
//! Provides a simple health check endpoint for load balancers and monitoring systems.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status (always "healthy" if reachable).
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Number of traces held in memory.
    pub traces: usize,
    /// Number of stored metric identities.
    pub metrics: usize,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check handler.
///
/// Reports the service identity and the size of the in-memory telemetry.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let observability = state.observability();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: observability.logger().service().to_string(),
        version: observability.logger().version().to_string(),
        traces: observability.tracer().trace_count(),
        metrics: observability.metrics().len(),
    })
}
