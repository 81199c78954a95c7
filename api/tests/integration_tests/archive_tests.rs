//! Integration tests for trace archiving.
//!
//! Tests cover:
//! - Archiving finished request traces
//! - Reading archived traces once the tracer has evicted them

use std::time::Duration;

use api::{create_router, AppState, TraceArchiver};
use axum::http::StatusCode;
use telemetry::storage::{InMemoryAlertStore, InMemoryTraceArchive};
use telemetry::{fields, Context, MemorySink, Observability, ObservabilityConfig};

use super::common::{get, test_app};

#[tokio::test]
async fn test_archived_request_traces_are_listed() {
    let (app, state) = test_app();

    get(app.clone(), "/health").await;
    get(app.clone(), "/health").await;

    let archiver = TraceArchiver::new(state.clone(), Duration::from_secs(60));
    assert_eq!(archiver.archive_once().unwrap(), 2);

    let (status, response) = get(app, "/api/v1/archive").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 2);
    assert_eq!(response["trace_ids"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_evicted_trace_is_served_from_archive() {
    let mut config = ObservabilityConfig::for_service("storewatch-api", "test");
    config.tracing.max_traces = Some(1);
    let log_buffer = MemorySink::new_shared(MemorySink::DEFAULT_CAPACITY);
    let state = AppState::new(
        Observability::from_config(&config, log_buffer.clone()),
        log_buffer,
        InMemoryAlertStore::new_shared(),
        InMemoryTraceArchive::new_shared(),
    );
    let tracer = state.observability().tracer();

    let (_, first) = tracer.start_trace(&Context::new(), "checkout", fields! {});
    tracer.finish_trace(&first);
    TraceArchiver::new(state.clone(), Duration::from_secs(60))
        .archive_once()
        .unwrap();

    let (_, second) = tracer.start_trace(&Context::new(), "refund", fields! {});
    tracer.finish_trace(&second);
    assert!(tracer.get_trace(first.trace_id()).is_none());

    let app = create_router(state);
    let (status, response) = get(app, &format!("/api/v1/traces/{}", first.trace_id())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["operation_name"], "checkout");
}

#[tokio::test]
async fn test_late_span_is_served_from_archive() {
    let (app, state) = test_app();
    let tracer = state.observability().tracer();
    let archiver = TraceArchiver::new(state.clone(), Duration::from_secs(60));

    let (ctx, trace) = tracer.start_trace(&Context::new(), "checkout", fields! {});
    let (_, charge) = tracer.start_span(&ctx, "charge card", fields! {});
    tracer.finish_trace(&trace);
    archiver.archive_once().unwrap();

    tracer.finish_span(&charge);
    let (_, receipt) = tracer.start_span(&ctx, "send receipt", fields! {});
    tracer.finish_span(&receipt);
    archiver.archive_once().unwrap();

    let archived = state.archive().get(trace.trace_id()).unwrap();
    assert_eq!(archived.spans.len(), 2);
    assert!(archived.spans.iter().all(|span| span.is_finished()));

    let (status, response) = get(app, "/api/v1/archive").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 1);
}
