//! Trace query endpoints.

use super::{clamp_limit, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use telemetry::models::Trace;
use telemetry::storage::ArchiveError;

const DEFAULT_LIMIT: usize = 100;

/// Query parameters for traces.
#[derive(Debug, Deserialize)]
pub struct TraceQueryParams {
    /// Only traces with this operation name.
    pub operation: Option<String>,
    /// Only finished (`true`) or open (`false`) traces.
    pub finished: Option<bool>,
    /// Maximum number of traces to return.
    pub limit: Option<usize>,
}

/// Response for trace queries.
#[derive(Debug, Serialize, Deserialize)]
pub struct TraceQueryResponse {
    /// Matching traces, most recently started first.
    pub traces: Vec<TraceSummary>,
    /// Number of matching traces before the limit was applied.
    pub total_count: usize,
}

/// A trace without its spans.
#[derive(Debug, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Trace id.
    pub id: String,
    /// Operation name.
    pub operation_name: String,
    /// Start time.
    pub start_time: DateTime<Utc>,
    /// Duration in microseconds, once finished.
    pub duration_us: Option<i64>,
    /// Span count snapshotted when the trace finished.
    pub span_count: usize,
    /// Spans currently recorded on the trace.
    pub spans_recorded: usize,
    /// Whether the trace has finished.
    pub finished: bool,
}

impl From<&Trace> for TraceSummary {
    fn from(trace: &Trace) -> Self {
        Self {
            id: trace.trace_id.clone(),
            operation_name: trace.operation_name.clone(),
            start_time: trace.start_time,
            duration_us: trace.duration.and_then(|d| d.num_microseconds()),
            span_count: trace.span_count,
            spans_recorded: trace.spans.len(),
            finished: trace.is_finished(),
        }
    }
}

/// Creates the traces routes.
pub fn traces_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/traces", get(query_traces))
        .route("/api/v1/traces/{trace_id}", get(get_trace))
        .with_state(state)
}

async fn query_traces(
    State(state): State<AppState>,
    Query(params): Query<TraceQueryParams>,
) -> Json<TraceQueryResponse> {
    let traces = state.observability().tracer().get_traces();

    let matching: Vec<TraceSummary> = traces
        .iter()
        .rev()
        .filter(|t| {
            params
                .operation
                .as_ref()
                .map_or(true, |op| &t.operation_name == op)
        })
        .filter(|t| params.finished.map_or(true, |f| t.is_finished() == f))
        .map(TraceSummary::from)
        .collect();

    let total_count = matching.len();
    let traces = matching
        .into_iter()
        .take(clamp_limit(params.limit, DEFAULT_LIMIT))
        .collect();

    Json(TraceQueryResponse {
        traces,
        total_count,
    })
}

/// Returns a trace from memory, falling back to the archive for traces the
/// tracer no longer retains.
async fn get_trace(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
) -> Result<Json<Trace>, ApiError> {
    if let Some(trace) = state.observability().tracer().get_trace(&trace_id) {
        return Ok(Json(trace));
    }

    match state.archive().get(&trace_id) {
        Ok(trace) => Ok(Json(trace)),
        Err(ArchiveError::NotFound(_)) => {
            Err(ApiError::NotFound(format!("Trace not found: {trace_id}")))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::ErrorBody;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use telemetry::{fields, Context};
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_query_traces_filters() {
        let state = AppState::with_in_memory_store();
        let tracer = state.observability().tracer();
        let (ctx, done) = tracer.start_trace(&Context::new(), "checkout", fields! {});
        let (_, span) = tracer.start_span(&ctx, "charge", fields! {});
        tracer.finish_span(&span);
        tracer.finish_trace(&done);
        tracer.start_trace(&Context::new(), "browse", fields! {});

        let (status, body) = get_json(traces_routes(state.clone()), "/api/v1/traces").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 2);
        assert_eq!(body["traces"][0]["operation_name"], "browse");

        let (_, body) = get_json(traces_routes(state.clone()), "/api/v1/traces?finished=true").await;
        let result: TraceQueryResponse = serde_json::from_value(body).unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.traces[0].id, done.trace_id());
        assert_eq!(result.traces[0].span_count, 1);
        assert!(result.traces[0].duration_us.is_some());

        let (_, body) = get_json(traces_routes(state), "/api/v1/traces?operation=browse&limit=5").await;
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["traces"][0]["finished"], false);
    }

    #[tokio::test]
    async fn test_get_trace_by_id() {
        let state = AppState::with_in_memory_store();
        let tracer = state.observability().tracer();
        let (ctx, trace) = tracer.start_trace(&Context::new(), "checkout", fields! {});
        tracer.start_span(&ctx, "reserve", fields! {});

        let uri = format!("/api/v1/traces/{}", trace.trace_id());
        let (status, body) = get_json(traces_routes(state), &uri).await;

        assert_eq!(status, StatusCode::OK);
        let result: Trace = serde_json::from_value(body).unwrap();
        assert_eq!(result.trace_id, trace.trace_id());
        assert_eq!(result.spans.len(), 1);
    }

    #[tokio::test]
    async fn test_get_trace_falls_back_to_archive() {
        let state = AppState::with_in_memory_store();
        let mut archived = Trace::new("archived-1", "old checkout", fields! {});
        archived.end_time = Some(archived.start_time);
        archived.duration = Some(chrono::Duration::zero());
        state.archive().archive(vec![archived]).unwrap();

        let (status, body) = get_json(traces_routes(state), "/api/v1/traces/archived-1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["operation_name"], "old checkout");
    }

    #[tokio::test]
    async fn test_get_trace_not_found() {
        let app = traces_routes(AppState::with_in_memory_store());

        let (status, body) = get_json(app, "/api/v1/traces/nonexistent").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ErrorBody = serde_json::from_value(body).unwrap();
        assert_eq!(error.error, "not_found");
    }
}
