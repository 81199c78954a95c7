//! Alert management endpoints.

use super::{clamp_limit, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use telemetry::models::{Alert, AlertSeverity, AlertStatus};
use telemetry::storage::AlertQuery;
use telemetry::{fields, Context};

const DEFAULT_LIMIT: usize = 100;

/// Request body for raising an alert.
#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    /// Short summary.
    pub title: String,
    /// Longer description (optional).
    #[serde(default)]
    pub description: String,
    /// Severity (optional, defaults to warning).
    #[serde(default)]
    pub severity: AlertSeverity,
    /// Originating service.
    pub service: String,
    /// Condition that triggered the alert.
    pub condition: String,
}

/// Query parameters for listing alerts.
#[derive(Debug, Deserialize)]
pub struct AlertListParams {
    /// Filter by originating service.
    pub service: Option<String>,
    /// Filter by status.
    pub status: Option<AlertStatus>,
    /// Filter by severity.
    pub severity: Option<AlertSeverity>,
    /// Maximum number of alerts to return.
    pub limit: Option<usize>,
}

/// Response for alert listings.
#[derive(Debug, Serialize, Deserialize)]
pub struct AlertListResponse {
    /// Matching alerts, newest first.
    pub alerts: Vec<Alert>,
    /// Number of matching alerts before the limit was applied.
    pub total_count: usize,
}

/// Creates the alert routes.
pub fn alerts_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/alerts", post(create_alert).get(list_alerts))
        .route("/api/v1/alerts/{id}", get(get_alert))
        .route("/api/v1/alerts/{id}/resolve", post(resolve_alert))
        .route("/api/v1/alerts/{id}/mute", post(mute_alert))
        .route("/api/v1/alerts/{id}/reactivate", post(reactivate_alert))
        .with_state(state)
}

async fn create_alert(
    State(state): State<AppState>,
    ctx: Option<Extension<Context>>,
    Json(request): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<Alert>), ApiError> {
    let ctx = ctx.map(|Extension(ctx)| ctx).unwrap_or_default();
    let alert = Alert::new(request.title, request.service, request.condition)
        .with_description(request.description)
        .with_severity(request.severity);

    let alert = state.alerts().insert(alert)?;

    let observability = state.observability();
    observability.metrics().increment(
        "alerts.created",
        [
            ("severity", alert.severity.to_string()),
            ("service", alert.service.clone()),
        ],
    );
    observability.logger().info(
        &ctx,
        "alert raised",
        &[fields! {
            "alert_id" => alert.id,
            "severity" => alert.severity,
            "service" => alert.service,
        }],
    );

    Ok((StatusCode::CREATED, Json(alert)))
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertListParams>,
) -> Result<Json<AlertListResponse>, ApiError> {
    let query = AlertQuery {
        service: params.service,
        status: params.status,
        severity: params.severity,
        limit: None,
    };

    let matching = state.alerts().list(&query)?;
    let total_count = matching.len();
    let alerts = matching
        .into_iter()
        .take(clamp_limit(params.limit, DEFAULT_LIMIT))
        .collect();

    Ok(Json(AlertListResponse {
        alerts,
        total_count,
    }))
}

async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    Ok(Json(state.alerts().get(&id)?))
}

async fn resolve_alert(
    State(state): State<AppState>,
    ctx: Option<Extension<Context>>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    transition(&state, ctx, &id, AlertStatus::Resolved)
}

async fn mute_alert(
    State(state): State<AppState>,
    ctx: Option<Extension<Context>>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    transition(&state, ctx, &id, AlertStatus::Muted)
}

async fn reactivate_alert(
    State(state): State<AppState>,
    ctx: Option<Extension<Context>>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    transition(&state, ctx, &id, AlertStatus::Active)
}

fn transition(
    state: &AppState,
    ctx: Option<Extension<Context>>,
    id: &str,
    status: AlertStatus,
) -> Result<Json<Alert>, ApiError> {
    let ctx = ctx.map(|Extension(ctx)| ctx).unwrap_or_default();
    let alert = state.alerts().update_status(id, status)?;

    state.observability().logger().info(
        &ctx,
        "alert status changed",
        &[fields! { "alert_id" => id, "status" => status }],
    );

    Ok(Json(alert))
}
