//! Metric snapshot endpoints.

use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use telemetry::models::Metric;

/// Query parameters for the metrics snapshot.
#[derive(Debug, Deserialize)]
pub struct MetricsQueryParams {
    /// Only return samples with this metric name.
    pub name: Option<String>,
}

/// Snapshot of the collector keyed by identity key.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsResponse {
    /// Samples keyed by identity key.
    pub metrics: HashMap<String, Metric>,
    /// Number of samples returned.
    pub total_count: usize,
}

/// Creates the metrics routes.
pub fn metrics_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/metrics", get(get_metrics).delete(reset_metrics))
        .with_state(state)
}

async fn get_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricsQueryParams>,
) -> Json<MetricsResponse> {
    let mut metrics = state.observability().metrics().get_metrics();
    if let Some(name) = params.name {
        metrics.retain(|_, metric| metric.name == name);
    }

    Json(MetricsResponse {
        total_count: metrics.len(),
        metrics,
    })
}

async fn reset_metrics(State(state): State<AppState>) -> StatusCode {
    state.observability().metrics().reset();
    tracing::info!("Metrics store reset");
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use telemetry::tags;
    use tower::ServiceExt;

    async fn fetch(app: Router, uri: &str) -> MetricsResponse {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_get_metrics_keyed_by_identity() {
        let state = AppState::with_in_memory_store();
        let metrics = state.observability().metrics();
        metrics.counter("orders", 1.0, tags! { "tenant" => "acme", "channel" => "web" });
        metrics.gauge("cart.size", 4.0, tags! {});

        let result = fetch(metrics_routes(state.clone()), "/api/v1/metrics").await;

        assert_eq!(result.total_count, 2);
        assert!(result.metrics.contains_key("orders{channel=web,tenant=acme}"));
        assert_eq!(result.metrics["cart.size"].value, 4.0);
    }

    #[tokio::test]
    async fn test_get_metrics_filtered_by_name() {
        let state = AppState::with_in_memory_store();
        let metrics = state.observability().metrics();
        metrics.increment("orders", tags! { "tenant" => "a" });
        metrics.increment("orders", tags! { "tenant" => "b" });
        metrics.gauge("cart.size", 4.0, tags! {});

        let result = fetch(metrics_routes(state), "/api/v1/metrics?name=orders").await;

        assert_eq!(result.total_count, 2);
        assert!(result.metrics.values().all(|m| m.name == "orders"));
    }

    #[tokio::test]
    async fn test_reset_metrics() {
        let state = AppState::with_in_memory_store();
        state.observability().metrics().increment("orders", tags! {});

        let response = metrics_routes(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.observability().metrics().is_empty());
    }
}
