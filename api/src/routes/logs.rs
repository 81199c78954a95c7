//! Recent log endpoint.
//!
//! Serves the structured records held by the in-memory log buffer.

use super::{clamp_limit, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use telemetry::models::{LogEntry, LogLevel};

const DEFAULT_LIMIT: usize = 100;

/// Query parameters for recent logs.
#[derive(Debug, Deserialize)]
pub struct LogQueryParams {
    /// Minimum level (`debug`, `info`, `warn`, `error`, `fatal`).
    pub level: Option<String>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
}

/// Response for log queries.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogQueryResponse {
    /// Matching records, newest first.
    pub logs: Vec<LogEntry>,
    /// Number of matching records before the limit was applied.
    pub total_count: usize,
}

/// Creates the logs routes.
pub fn logs_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/logs", get(query_logs))
        .with_state(state)
}

async fn query_logs(
    State(state): State<AppState>,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<LogQueryResponse>, ApiError> {
    let min_level = params
        .level
        .as_deref()
        .map(str::parse::<LogLevel>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
        .unwrap_or(LogLevel::Debug);

    let matching: Vec<LogEntry> = state
        .log_buffer()
        .entries()
        .into_iter()
        .rev()
        .filter(|entry| entry.level >= min_level)
        .collect();

    let total_count = matching.len();
    let logs = matching
        .into_iter()
        .take(clamp_limit(params.limit, DEFAULT_LIMIT))
        .collect();

    Ok(Json(LogQueryResponse { logs, total_count }))
}
