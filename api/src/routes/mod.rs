//! API route definitions.
//!
//! This module organizes all HTTP routes for the Storewatch API server.

mod alerts;
mod archive;
mod health;
mod logs;
mod metrics;
mod traces;

pub use alerts::alerts_routes;
pub use archive::archive_routes;
pub use health::health_routes;
pub use logs::logs_routes;
pub use metrics::metrics_routes;
pub use traces::traces_routes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use telemetry::storage::{AlertStoreError, ArchiveError};
use thiserror::Error;

/// Largest `limit` accepted by list endpoints.
pub(crate) const MAX_LIMIT: usize = 1000;

/// JSON error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable description.
    pub message: String,
}

/// Errors surfaced by route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request was malformed.
    #[error("{0}")]
    BadRequest(String),

    /// A storage backend failed.
    #[error("{0}")]
    Storage(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let body = ErrorBody {
            error: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AlertStoreError> for ApiError {
    fn from(err: AlertStoreError) -> Self {
        match err {
            AlertStoreError::NotFound(_) => Self::NotFound(err.to_string()),
            AlertStoreError::Invalid(_) => Self::BadRequest(err.to_string()),
            AlertStoreError::LockError => Self::Storage(err.to_string()),
        }
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NotFound(_) => Self::NotFound(err.to_string()),
            ArchiveError::Unfinished(_) | ArchiveError::LockError => Self::Storage(err.to_string()),
        }
    }
}

/// Clamps a requested page size to `1..=MAX_LIMIT`.
pub(crate) fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_api_error_response_shape() {
        let response = ApiError::NotFound("Trace not found: abc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let error: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "not_found");
        assert_eq!(error.message, "Trace not found: abc");
    }

    #[test]
    fn test_alert_store_error_mapping() {
        assert!(matches!(
            ApiError::from(AlertStoreError::Invalid("x".to_string())),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(AlertStoreError::LockError),
            ApiError::Storage(_)
        ));
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 50), 50);
        assert_eq!(clamp_limit(Some(0), 50), 1);
        assert_eq!(clamp_limit(Some(5000), 50), MAX_LIMIT);
    }
}
