//! Integration tests for the metric snapshot.
//!
//! Tests cover:
//! - Samples recorded in-process showing up keyed by identity
//! - Request metrics recorded by the middleware
//! - Filtering by name and resetting

use axum::http::StatusCode;
use telemetry::tags;

use super::common::{delete, get, test_app};

#[tokio::test]
async fn test_recorded_metrics_are_served() {
    let (app, state) = test_app();
    let metrics = state.observability().metrics();

    metrics.counter("orders.placed", 3.0, tags! { "channel" => "web" });
    metrics.gauge("cart.size", 4.0, tags! {});
    metrics.record_business_metric("revenue", 129.5, tags! { "currency" => "EUR" });

    let (status, response) = get(app, "/api/v1/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 3);

    let served = &response["metrics"];
    assert_eq!(served["orders.placed{channel=web}"]["value"], 3.0);
    assert_eq!(served["cart.size"]["metric_type"], "gauge");
    assert_eq!(
        served["business.revenue{category=business,currency=EUR}"]["value"],
        129.5
    );
}

#[tokio::test]
async fn test_requests_are_counted_by_route_template() {
    let (app, _state) = test_app();

    get(app.clone(), "/api/v1/traces/first").await;
    get(app.clone(), "/api/v1/traces/second").await;

    let (_, response) = get(app, "/api/v1/metrics?name=http.requests").await;
    assert_eq!(response["total_count"], 1);

    let counters = response["metrics"].as_object().unwrap();
    let counter = counters.values().next().unwrap();
    assert_eq!(counter["metric_type"], "counter");
    assert_eq!(counter["tags"]["route"], "/api/v1/traces/{trace_id}");
    assert_eq!(counter["tags"]["status"], "404");
}

#[tokio::test]
async fn test_reset_metrics() {
    let (app, state) = test_app();
    state.observability().metrics().increment("orders.placed", tags! {});

    let status = delete(app.clone(), "/api/v1/metrics").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Only the DELETE request itself was recorded after the reset
    let (_, response) = get(app, "/api/v1/metrics?name=orders.placed").await;
    assert_eq!(response["total_count"], 0);
}
