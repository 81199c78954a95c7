//! Trace archive listing.

use super::{clamp_limit, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: usize = 100;

/// Query parameters for the archive listing.
#[derive(Debug, Deserialize)]
pub struct ArchiveQueryParams {
    /// Maximum number of ids to return.
    pub limit: Option<usize>,
}

/// Ids of archived traces.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveListResponse {
    /// Archived trace ids, most recently started first.
    pub trace_ids: Vec<String>,
    /// Total number of archived traces.
    pub total_count: usize,
}

/// Creates the archive routes.
pub fn archive_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/archive", get(list_archive))
        .with_state(state)
}

async fn list_archive(
    State(state): State<AppState>,
    Query(params): Query<ArchiveQueryParams>,
) -> Result<Json<ArchiveListResponse>, ApiError> {
    let archive = state.archive();
    let limit = clamp_limit(params.limit, DEFAULT_LIMIT);

    let trace_ids = archive
        .list(Some(limit))?
        .into_iter()
        .map(|trace| trace.trace_id)
        .collect();

    Ok(Json(ArchiveListResponse {
        trace_ids,
        total_count: archive.count()?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use telemetry::{fields, Context};
    use tower::ServiceExt;

    async fn fetch(app: Router, uri: &str) -> ArchiveListResponse {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_list_archive_empty() {
        let result = fetch(archive_routes(AppState::with_in_memory_store()), "/api/v1/archive").await;

        assert!(result.trace_ids.is_empty());
        assert_eq!(result.total_count, 0);
    }

    #[tokio::test]
    async fn test_list_archive_with_limit() {
        let state = AppState::with_in_memory_store();
        let tracer = state.observability().tracer();
        for op in ["checkout", "refund", "browse"] {
            let (_, trace) = tracer.start_trace(&Context::new(), op, fields! {});
            tracer.finish_trace(&trace);
        }
        state.archive().archive(tracer.finished_traces()).unwrap();

        let result = fetch(archive_routes(state), "/api/v1/archive?limit=2").await;

        assert_eq!(result.trace_ids.len(), 2);
        assert_eq!(result.total_count, 3);
    }
}
