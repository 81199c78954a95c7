//! One entry point for "log + metric + trace" instrumentation.
//!
//! `Observability` owns nothing but references to a logger, a metrics
//! collector and a tracer. Cloning it is cheap and every clone records into
//! the same collector and tracer.

use crate::config::ObservabilityConfig;
use crate::context::Context;
use crate::logger::{LogSink, StructuredLogger};
use crate::metrics::MetricsCollector;
use crate::models::{Fields, LogLevel, Tags};
use crate::tracer::Tracer;
use serde_json::Value;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timer recorded by [`Observability::observe`].
pub const OPERATION_DURATION: &str = "operation.duration";
/// Timer recorded by [`Observability::record_request`].
pub const HTTP_REQUEST_DURATION: &str = "http.request.duration";
/// Counter recorded by [`Observability::record_request`].
pub const HTTP_REQUESTS: &str = "http.requests";

/// Logger, metrics collector and tracer behind one handle.
#[derive(Clone)]
pub struct Observability {
    logger: StructuredLogger,
    metrics: Arc<MetricsCollector>,
    tracer: Arc<Tracer>,
}

impl std::fmt::Debug for Observability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observability")
            .field("service", &self.logger.service())
            .field("metrics", &self.metrics.len())
            .field("traces", &self.tracer.trace_count())
            .finish()
    }
}

impl Observability {
    /// Composes existing components.
    #[must_use]
    pub fn new(
        logger: StructuredLogger,
        metrics: Arc<MetricsCollector>,
        tracer: Arc<Tracer>,
    ) -> Self {
        Self {
            logger,
            metrics,
            tracer,
        }
    }

    /// Builds all three components from configuration, logging to `sink`.
    #[must_use]
    pub fn from_config(config: &ObservabilityConfig, sink: Arc<dyn LogSink>) -> Self {
        let logger = StructuredLogger::new(
            config.service_name.clone(),
            config.service_version.clone(),
            config.logging.level,
            sink,
        );
        let metrics = MetricsCollector::with_default_tags(
            config.service_name.clone(),
            config.service_version.clone(),
            config.metrics.default_tags.clone(),
        );
        let tracer = Tracer::from_config(config.tracing.clone());
        Self::new(logger, Arc::new(metrics), Arc::new(tracer))
    }

    /// The logger.
    #[must_use]
    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// The metrics collector.
    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// The tracer.
    #[must_use]
    pub fn tracer(&self) -> &Arc<Tracer> {
        &self.tracer
    }

    /// Runs `f` as an observed operation.
    ///
    /// Opens a span, records timer `operation.duration` tagged with
    /// `operation` and `status=ok|error`, and logs the outcome (debug on
    /// success, error with detail on failure). Returns `f`'s result
    /// unchanged.
    pub fn observe<T, E, F>(&self, ctx: &Context, operation: &str, tags: Tags, f: F) -> Result<T, E>
    where
        E: StdError,
        F: FnOnce(&Context) -> Result<T, E>,
    {
        let (span_ctx, span) = self.tracer.start_span(ctx, operation, tags_to_fields(&tags));
        let start = Instant::now();
        let result = f(&span_ctx);
        let elapsed = start.elapsed();

        if let Err(err) = &result {
            self.tracer.set_span_error(&span, err);
        }
        self.tracer.finish_span(&span);
        self.report(&span_ctx, operation, tags, elapsed, result.as_ref().err());
        result
    }

    /// Async form of [`observe`](Self::observe).
    pub async fn observe_async<T, E, F, Fut>(
        &self,
        ctx: &Context,
        operation: &str,
        tags: Tags,
        f: F,
    ) -> Result<T, E>
    where
        E: StdError,
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let (span_ctx, span) = self.tracer.start_span(ctx, operation, tags_to_fields(&tags));
        let start = Instant::now();
        let result = f(span_ctx.clone()).await;
        let elapsed = start.elapsed();

        if let Err(err) = &result {
            self.tracer.set_span_error(&span, err);
        }
        self.tracer.finish_span(&span);
        self.report(&span_ctx, operation, tags, elapsed, result.as_ref().err());
        result
    }

    /// Records one handled HTTP request.
    ///
    /// Timer `http.request.duration` and counter `http.requests`, both tagged
    /// `method`, `route` and `status`, plus a request-line log at info
    /// (warn for 4xx, error for 5xx).
    pub fn record_request(
        &self,
        ctx: &Context,
        method: &str,
        route: &str,
        status: u16,
        duration: Duration,
    ) {
        let status_text = status.to_string();
        let tags = [
            ("method", method),
            ("route", route),
            ("status", status_text.as_str()),
        ];
        self.metrics
            .record_duration(HTTP_REQUEST_DURATION, duration, tags);
        self.metrics.increment(HTTP_REQUESTS, tags);

        let level = match status {
            500.. => LogLevel::Error,
            400..=499 => LogLevel::Warn,
            _ => LogLevel::Info,
        };
        let mut fields = Fields::new();
        fields.insert("method".to_string(), Value::from(method));
        fields.insert("route".to_string(), Value::from(route));
        fields.insert("status".to_string(), Value::from(status));
        fields.insert("duration_ms".to_string(), Value::from(millis(duration)));
        self.logger.log(
            level,
            ctx,
            &format!("{method} {route} {status}"),
            &[fields],
        );
    }

    fn report<E>(
        &self,
        ctx: &Context,
        operation: &str,
        mut tags: Tags,
        elapsed: Duration,
        err: Option<&E>,
    ) where
        E: StdError,
    {
        tags.insert("operation".to_string(), operation.to_string());
        tags.insert(
            "status".to_string(),
            if err.is_some() { "error" } else { "ok" }.to_string(),
        );
        self.metrics.record_duration(OPERATION_DURATION, elapsed, tags);

        let mut fields = Fields::new();
        fields.insert("operation".to_string(), Value::from(operation));
        fields.insert("duration_ms".to_string(), Value::from(millis(elapsed)));
        match err {
            Some(err) => self
                .logger
                .error(ctx, &format!("{operation} failed"), err, &[fields]),
            None => self
                .logger
                .debug(ctx, &format!("{operation} completed"), &[fields]),
        }
    }
}

fn tags_to_fields(tags: &Tags) -> Fields {
    tags.iter()
        .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
        .collect()
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
