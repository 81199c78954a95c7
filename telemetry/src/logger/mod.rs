//! Leveled, contextual structured logging.
//!
//! A `StructuredLogger` is an immutable value. `with_*` methods return a new
//! logger carrying a copy of the accumulated context, so loggers derived from
//! the same parent never interfere with each other or with the parent.

mod sink;

pub use sink::{
    ConsoleSink, FanoutSink, LogFormat, LogSink, MemorySink, NoopSink, ParseFormatError,
    TracingSink,
};

use crate::context::Context;
use crate::models::{ErrorDetail, Fields, LogEntry, LogLevel};
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Context accumulated by `with_*` calls.
#[derive(Debug, Clone, Default)]
struct LoggerContext {
    fields: Fields,
    request_id: Option<String>,
    user_id: Option<String>,
    tenant_id: Option<String>,
    trace_id: Option<String>,
    span_id: Option<String>,
}

/// Structured logger with immutable fluent context.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use telemetry::{fields, Context, LogLevel, MemorySink, StructuredLogger};
///
/// let sink = Arc::new(MemorySink::default());
/// let logger = StructuredLogger::new("cart", "1.4.0", LogLevel::Info, sink.clone())
///     .with_field("module", "cart");
///
/// let ctx = Context::new().with_request_id("req-7");
/// logger.info(&ctx, "item added", &[fields! { "sku" => "A-1", "qty" => 2 }]);
/// logger.debug(&ctx, "suppressed", &[]);
///
/// let entries = sink.entries();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].request_id.as_deref(), Some("req-7"));
/// assert_eq!(entries[0].fields["qty"], 2);
/// ```
#[derive(Clone)]
pub struct StructuredLogger {
    service: Arc<str>,
    version: Arc<str>,
    min_level: LogLevel,
    sink: Arc<dyn LogSink>,
    context: Arc<LoggerContext>,
}

impl fmt::Debug for StructuredLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredLogger")
            .field("service", &self.service)
            .field("version", &self.version)
            .field("min_level", &self.min_level)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl StructuredLogger {
    /// Creates a logger for a service that emits records at or above `min_level`.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        version: impl Into<String>,
        min_level: LogLevel,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            service: Arc::from(service.into()),
            version: Arc::from(version.into()),
            min_level,
            sink,
            context: Arc::new(LoggerContext::default()),
        }
    }

    /// The configured threshold.
    #[must_use]
    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// The service name stamped on records.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The service version stamped on records.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns true iff a record at `level` would be emitted.
    #[must_use]
    pub fn should_log(&self, level: LogLevel) -> bool {
        level.rank() >= self.min_level.rank()
    }

    fn derive(&self, update: impl FnOnce(&mut LoggerContext)) -> Self {
        let mut context = (*self.context).clone();
        update(&mut context);
        Self {
            context: Arc::new(context),
            ..self.clone()
        }
    }

    /// Returns a logger that adds `key` to every record.
    ///
    /// Values that fail to serialize are recorded as `null`.
    #[must_use]
    pub fn with_field(&self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        let key = key.into();
        self.derive(|c| {
            c.fields.insert(key, value);
        })
    }

    /// Returns a logger that adds all of `fields` to every record.
    #[must_use]
    pub fn with_fields(&self, fields: Fields) -> Self {
        self.derive(|c| c.fields.extend(fields))
    }

    /// Returns a logger carrying a request id.
    #[must_use]
    pub fn with_request_id(&self, request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        self.derive(|c| c.request_id = Some(request_id))
    }

    /// Returns a logger carrying a user id.
    #[must_use]
    pub fn with_user_id(&self, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        self.derive(|c| c.user_id = Some(user_id))
    }

    /// Returns a logger carrying a tenant id.
    #[must_use]
    pub fn with_tenant_id(&self, tenant_id: impl Into<String>) -> Self {
        let tenant_id = tenant_id.into();
        self.derive(|c| c.tenant_id = Some(tenant_id))
    }

    /// Returns a logger carrying trace and span ids.
    #[must_use]
    pub fn with_trace(&self, trace_id: impl Into<String>, span_id: Option<String>) -> Self {
        let trace_id = trace_id.into();
        self.derive(|c| {
            c.trace_id = Some(trace_id);
            c.span_id = span_id;
        })
    }

    /// Logs at debug level.
    pub fn debug(&self, ctx: &Context, message: &str, fields: &[Fields]) {
        self.log(LogLevel::Debug, ctx, message, fields);
    }

    /// Logs at info level.
    pub fn info(&self, ctx: &Context, message: &str, fields: &[Fields]) {
        self.log(LogLevel::Info, ctx, message, fields);
    }

    /// Logs at warn level.
    pub fn warn(&self, ctx: &Context, message: &str, fields: &[Fields]) {
        self.log(LogLevel::Warn, ctx, message, fields);
    }

    /// Logs at error level with an error detail block built from `err`.
    pub fn error<E>(&self, ctx: &Context, message: &str, err: &E, fields: &[Fields])
    where
        E: StdError + ?Sized,
    {
        if self.should_log(LogLevel::Error) {
            self.emit(
                LogLevel::Error,
                ctx,
                message,
                fields,
                Some(ErrorDetail::from_error(err)),
            );
        }
    }

    /// Emits a fatal record synchronously, then terminates the process with
    /// exit status 1.
    ///
    /// Only for unrecoverable conditions.
    pub fn fatal<E>(&self, ctx: &Context, message: &str, err: Option<&E>, fields: &[Fields]) -> !
    where
        E: StdError + ?Sized,
    {
        self.emit(
            LogLevel::Fatal,
            ctx,
            message,
            fields,
            err.map(ErrorDetail::from_error),
        );
        self.sink.flush();
        std::process::exit(1)
    }

    /// Logs at an arbitrary level without an error detail.
    pub fn log(&self, level: LogLevel, ctx: &Context, message: &str, fields: &[Fields]) {
        if self.should_log(level) {
            self.emit(level, ctx, message, fields, None);
        }
    }

    /// Logs at an arbitrary level with a prepared error detail.
    pub fn log_with_error(
        &self,
        level: LogLevel,
        ctx: &Context,
        message: &str,
        error: ErrorDetail,
        fields: &[Fields],
    ) {
        if self.should_log(level) {
            self.emit(level, ctx, message, fields, Some(error));
        }
    }

    /// Builds the canonical record without the level check and hands it to
    /// the sink.
    fn emit(
        &self,
        level: LogLevel,
        ctx: &Context,
        message: &str,
        extra: &[Fields],
        error: Option<ErrorDetail>,
    ) {
        let entry = self.build_entry(level, ctx, message, extra, error);
        self.sink.write(&entry);
    }

    fn build_entry(
        &self,
        level: LogLevel,
        ctx: &Context,
        message: &str,
        extra: &[Fields],
        error: Option<ErrorDetail>,
    ) -> LogEntry {
        let base = &self.context;
        let pick = |call: Option<&str>, own: &Option<String>| {
            call.map(str::to_string).or_else(|| own.clone())
        };

        let mut entry = LogEntry::new(level, message, &*self.service, &*self.version);
        entry.request_id = pick(ctx.request_id(), &base.request_id);
        entry.user_id = pick(ctx.user_id(), &base.user_id);
        entry.tenant_id = pick(ctx.tenant_id(), &base.tenant_id);
        entry.trace_id = pick(ctx.trace_id(), &base.trace_id);
        entry.span_id = pick(ctx.span_id(), &base.span_id);

        entry.fields = base.fields.clone();
        for fields in extra {
            entry
                .fields
                .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        entry.error = error;
        entry
    }
}
