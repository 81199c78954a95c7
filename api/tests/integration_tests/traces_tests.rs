//! Integration tests for trace querying.
//!
//! Tests cover:
//! - Traces recorded in-process with nested spans
//! - Traces recorded for HTTP requests by the middleware
//! - Filtering and limits
//! - Error handling for non-existent traces

use axum::http::StatusCode;
use telemetry::{fields, Context};

use super::common::{get, test_app};

#[tokio::test]
async fn test_get_trace_with_nested_spans() {
    let (app, state) = test_app();
    let tracer = state.observability().tracer();

    let (ctx, trace) = tracer.start_trace(
        &Context::new().with_request_id("req-7"),
        "checkout",
        fields! { "cart_id" => "c-1" },
    );
    let (child_ctx, reserve) = tracer.start_span(&ctx, "reserve stock", fields! {});
    let (_, query) = tracer.start_span(&child_ctx, "SELECT stock", fields! {});
    tracer.add_span_tag(&query, "db.system", "postgresql");
    tracer.finish_span(&query);
    tracer.finish_span(&reserve);
    tracer.finish_trace(&trace);

    let (status, response) = get(app, &format!("/api/v1/traces/{}", trace.trace_id())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["trace_id"], trace.trace_id());
    assert_eq!(response["operation_name"], "checkout");
    assert_eq!(response["span_count"], 2);

    let spans = response["spans"].as_array().unwrap();
    let root = spans.iter().find(|s| s["operation_name"] == "reserve stock").unwrap();
    let leaf = spans.iter().find(|s| s["operation_name"] == "SELECT stock").unwrap();
    assert_eq!(leaf["parent_span_id"], root["span_id"]);
    assert_eq!(leaf["tags"]["db.system"], "postgresql");
    assert!(leaf["end_time"].is_string());
}

#[tokio::test]
async fn test_requests_are_traced() {
    let (app, _state) = test_app();

    let (status, _) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);

    let (_, response) = get(app, "/api/v1/traces?finished=true").await;
    assert_eq!(response["total_count"], 1);

    let summary = &response["traces"][0];
    assert_eq!(summary["operation_name"], "GET /health");
    assert_eq!(summary["finished"], true);
    assert!(summary["duration_us"].is_number());
}

#[tokio::test]
async fn test_query_traces_by_operation_and_limit() {
    let (app, state) = test_app();
    let tracer = state.observability().tracer();

    for _ in 0..3 {
        let (_, trace) = tracer.start_trace(&Context::new(), "refund", fields! {});
        tracer.finish_trace(&trace);
    }
    tracer.start_trace(&Context::new(), "browse", fields! {});

    let (_, response) = get(app.clone(), "/api/v1/traces?operation=refund&limit=2").await;
    assert_eq!(response["total_count"], 3);
    assert_eq!(response["traces"].as_array().unwrap().len(), 2);

    let (_, response) = get(app, "/api/v1/traces?operation=browse&finished=false").await;
    assert_eq!(response["total_count"], 1);
    assert_eq!(response["traces"][0]["spans_recorded"], 0);
}

#[tokio::test]
async fn test_get_nonexistent_trace() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/api/v1/traces/nonexistent-trace-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["error"], "not_found");
}
