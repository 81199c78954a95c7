//! Request instrumentation.
//!
//! Every request handled by the router gets a trace, a request-line log, a
//! latency timer and a request counter.

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use telemetry::{fields, Context};
use uuid::Uuid;

/// Header carrying the caller's request id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Header carrying the id of the trace recorded for the request.
pub const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// Instruments one request.
///
/// The request id comes from `x-request-id` or is generated. Handlers can
/// pick up the request's [`Context`] with `Extension<Context>`.
pub async fn instrument(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let observability = state.observability();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| path.clone(), |matched| matched.as_str().to_string());

    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map_or_else(|| Uuid::new_v4().simple().to_string(), str::to_string);

    let (ctx, trace) = observability.tracer().start_trace(
        &Context::new().with_request_id(request_id.clone()),
        &format!("{method} {path}"),
        fields! { "method" => method, "path" => path },
    );
    request.extensions_mut().insert(ctx.clone());

    let started = Instant::now();
    let mut response = next.run(request).await;
    let elapsed = started.elapsed();

    observability.record_request(
        &ctx,
        &method,
        &route,
        response.status().as_u16(),
        elapsed,
    );
    observability.tracer().finish_trace(&trace);

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(trace.trace_id()) {
        headers.insert(TRACE_ID_HEADER, value);
    }

    response
}
