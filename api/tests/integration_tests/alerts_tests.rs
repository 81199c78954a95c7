//! Integration tests for alert management.
//!
//! Tests cover:
//! - Raising alerts and the metric and log they produce
//! - Status transitions
//! - Filtering
//! - Validation and not-found errors

use axum::http::StatusCode;
use serde_json::json;
use telemetry::LogLevel;

use super::common::{get, post, post_json, test_app};

#[tokio::test]
async fn test_raise_and_resolve_alert() {
    let (app, state) = test_app();

    let (status, alert) = post_json(
        app.clone(),
        "/api/v1/alerts",
        json!({
            "title": "Checkout latency",
            "description": "p99 above two seconds",
            "service": "checkout",
            "condition": "http.request.duration p99 > 2000",
            "severity": "critical"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(alert["status"], "active");
    assert_eq!(alert["description"], "p99 above two seconds");

    let id = alert["id"].as_str().unwrap();
    let (status, resolved) = post(app.clone(), &format!("/api/v1/alerts/{id}/resolve")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "resolved");

    let (_, fetched) = get(app, &format!("/api/v1/alerts/{id}")).await;
    assert_eq!(fetched["status"], "resolved");

    assert!(state
        .observability()
        .metrics()
        .get(
            "alerts.created",
            [("severity", "critical"), ("service", "checkout")]
        )
        .is_some());

    let raised = state
        .log_buffer()
        .entries()
        .into_iter()
        .find(|entry| entry.message == "alert raised")
        .unwrap();
    assert_eq!(raised.level, LogLevel::Info);
    assert!(raised.trace_id.is_some());
    assert!(raised.request_id.is_some());
}

#[tokio::test]
async fn test_list_alerts_by_severity() {
    let (app, _state) = test_app();

    for (title, severity) in [("Disk", "warning"), ("Queue", "critical"), ("Cache", "info")] {
        post_json(
            app.clone(),
            "/api/v1/alerts",
            json!({
                "title": title,
                "service": "ops",
                "condition": "x > 1",
                "severity": severity
            }),
        )
        .await;
    }

    let (status, response) = get(app.clone(), "/api/v1/alerts?severity=critical").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 1);
    assert_eq!(response["alerts"][0]["title"], "Queue");

    let (_, response) = get(app, "/api/v1/alerts?service=ops&limit=2").await;
    assert_eq!(response["total_count"], 3);
    assert_eq!(response["alerts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_severity_defaults_to_warning() {
    let (app, _state) = test_app();

    let (_, alert) = post_json(
        app,
        "/api/v1/alerts",
        json!({"title": "Disk", "service": "ops", "condition": "disk > 90%"}),
    )
    .await;

    assert_eq!(alert["severity"], "warning");
}

#[tokio::test]
async fn test_invalid_alert_is_rejected() {
    let (app, _state) = test_app();

    let (status, response) = post_json(
        app.clone(),
        "/api/v1/alerts",
        json!({"title": "Disk", "service": "", "condition": "disk > 90%"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "bad_request");

    let (_, response) = get(app, "/api/v1/alerts").await;
    assert_eq!(response["total_count"], 0);
}

#[tokio::test]
async fn test_transition_unknown_alert() {
    let (app, _state) = test_app();

    let (status, response) = post(app, "/api/v1/alerts/missing/mute").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["error"], "not_found");
}
