//! Integration tests for health check and general API functionality.
//!
//! Tests cover:
//! - Health check endpoint
//! - Fresh state behavior
//! - Request-line logging

use axum::http::StatusCode;
use telemetry::LogLevel;

use super::common::{get, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "storewatch-api");
    assert_eq!(response["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_fresh_state_only_holds_operator_requests() {
    let (app, _state) = test_app();

    // The first request sees nothing; its own request line is logged afterwards
    let (status, response) = get(app.clone(), "/api/v1/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 0);
    assert!(response["logs"].as_array().unwrap().is_empty());

    // Only the request timer and counter of the previous call
    let (status, response) = get(app.clone(), "/api/v1/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 2);

    let (status, response) = get(app.clone(), "/api/v1/alerts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 0);

    let (status, response) = get(app, "/api/v1/archive").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 0);
}

#[tokio::test]
async fn test_client_errors_are_logged_as_warnings() {
    let (app, state) = test_app();

    let (status, _) = get(app, "/api/v1/logs?level=loud").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let entries = state.log_buffer().entries();
    let request_line = entries.last().unwrap();
    assert_eq!(request_line.message, "GET /api/v1/logs 400");
    assert_eq!(request_line.level, LogLevel::Warn);
}
