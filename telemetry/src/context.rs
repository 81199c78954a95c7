//! Call-context correlation.
//!
//! `Context` is the only channel through which a new span learns its trace
//! and parent, and through which log records pick up correlation ids. It is
//! an immutable value: every setter returns a new context.
//!
//! Request, user and tenant ids are set by callers. Trace and span ids can
//! only be set by the tracer, so a context can never point at a trace that
//! the tracer did not start.

/// Correlation data threaded through instrumented calls.
///
/// # Example
///
/// ```
/// use telemetry::Context;
///
/// let ctx = Context::new()
///     .with_request_id("req-42")
///     .with_tenant_id("acme");
///
/// assert_eq!(ctx.request_id(), Some("req-42"));
/// assert_eq!(ctx.trace_id(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    request_id: Option<String>,
    user_id: Option<String>,
    tenant_id: Option<String>,
    trace_id: Option<String>,
    span_id: Option<String>,
}

impl Context {
    /// Creates a bare context with no correlation data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy carrying the given request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns a copy carrying the given user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Returns a copy carrying the given tenant id.
    #[must_use]
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Request id, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// User id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Tenant id, if any.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Id of the current trace, if any.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Id of the current span, if any.
    #[must_use]
    pub fn span_id(&self) -> Option<&str> {
        self.span_id.as_deref()
    }

    /// Enters a trace: the trace becomes current and there is no current span.
    pub(crate) fn enter_trace(&self, trace_id: &str) -> Self {
        Self {
            trace_id: Some(trace_id.to_string()),
            span_id: None,
            ..self.clone()
        }
    }

    /// Enters a span, keeping whatever trace was current.
    pub(crate) fn enter_span(&self, span_id: &str) -> Self {
        Self {
            span_id: Some(span_id.to_string()),
            ..self.clone()
        }
    }
}
