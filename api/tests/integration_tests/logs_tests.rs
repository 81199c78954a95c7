//! Integration tests for recent log queries.
//!
//! Tests cover:
//! - Records written by the structured logger with correlation ids
//! - Minimum-level filtering and limits
//! - Request-line records written by the middleware

use axum::http::StatusCode;
use telemetry::{fields, Context};

use super::common::{get, test_app};

#[derive(Debug, thiserror::Error)]
#[error("payment gateway timed out")]
struct GatewayTimeout;

#[tokio::test]
async fn test_logged_records_carry_context() {
    let (app, state) = test_app();
    let logger = state
        .observability()
        .logger()
        .with_field("component", "checkout");
    let ctx = Context::new()
        .with_request_id("req-9")
        .with_user_id("u-1")
        .with_tenant_id("acme");

    logger.error(&ctx, "charge failed", &GatewayTimeout, &[fields! { "amount" => 42 }]);

    let (status, response) = get(app, "/api/v1/logs?level=error").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 1);

    let record = &response["logs"][0];
    assert_eq!(record["message"], "charge failed");
    assert_eq!(record["level"], "error");
    assert_eq!(record["request_id"], "req-9");
    assert_eq!(record["user_id"], "u-1");
    assert_eq!(record["tenant_id"], "acme");
    assert_eq!(record["fields"]["component"], "checkout");
    assert_eq!(record["error"]["message"], "payment gateway timed out");
    assert_eq!(record["fields"]["amount"], 42);
}

#[tokio::test]
async fn test_request_lines_are_logged() {
    let (app, _state) = test_app();

    get(app.clone(), "/health").await;
    get(app.clone(), "/health").await;

    let (_, response) = get(app, "/api/v1/logs?level=info&limit=1").await;
    assert_eq!(response["total_count"], 2);

    let logs = response["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["message"], "GET /health 200");
    assert!(logs[0]["trace_id"].is_string());
    assert!(logs[0]["request_id"].is_string());
}

#[tokio::test]
async fn test_unknown_level_is_rejected() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/api/v1/logs?level=verbose").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "bad_request");
}
