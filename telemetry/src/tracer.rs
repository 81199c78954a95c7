//! Trace and span tree builder correlated through `Context`.
//!
//! All records live in one registry behind a single reader/writer lock and
//! are mutated in place there. Callers hold lightweight handles carrying ids;
//! every read returns a deep clone.
//!
//! A new span learns its trace and parent only from the context it is started
//! with. A span started from a context without a trace is a legal orphan: it
//! carries an empty trace id and is kept in a separate, id-indexed list.
//!
//! Every change to a trace bumps a tracer-wide revision. Archiving
//! collaborators call [`Tracer::finished_since`] with the last revision they
//! saw and only receive finished traces that changed after it.
//!
//! # Limitations
//!
//! Unless `max_traces` is configured, traces, spans and orphan spans are
//! retained for the life of the tracer. When it is set, the same cap bounds
//! the number of traces and, separately, the number of orphan spans; the
//! oldest are evicted first.

use crate::config::TracingConfig;
use crate::context::Context;
use crate::models::{Fields, Span, SpanLog, Trace};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Handle to a started trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceHandle {
    trace_id: String,
}

impl TraceHandle {
    /// Id of the trace.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

/// Handle to a started span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpanHandle {
    span_id: String,
    trace_id: String,
}

impl SpanHandle {
    /// Id of the span.
    #[must_use]
    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    /// Id of the owning trace, or `None` for an orphan span.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        if self.trace_id.is_empty() {
            None
        } else {
            Some(&self.trace_id)
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    traces: HashMap<String, Trace>,
    /// Trace ids in start order.
    order: VecDeque<String>,
    orphans: HashMap<String, Span>,
    /// Orphan span ids in start order.
    orphan_order: VecDeque<String>,
    /// Last revision handed out.
    revision: u64,
    /// Revision of each trace's latest change.
    revisions: HashMap<String, u64>,
    /// Trace id by revision of its latest change.
    changes: BTreeMap<u64, String>,
}

impl Registry {
    fn insert_trace(&mut self, trace: Trace) {
        let trace_id = trace.trace_id.clone();
        self.order.push_back(trace_id.clone());
        self.traces.insert(trace_id.clone(), trace);
        self.touch(&trace_id);
    }

    fn insert_orphan(&mut self, span: Span) {
        self.orphan_order.push_back(span.span_id.clone());
        self.orphans.insert(span.span_id.clone(), span);
    }

    /// Records a change to a retained trace.
    fn touch(&mut self, trace_id: &str) {
        self.revision += 1;
        if let Some(previous) = self.revisions.insert(trace_id.to_string(), self.revision) {
            self.changes.remove(&previous);
        }
        self.changes.insert(self.revision, trace_id.to_string());
    }

    /// Applies `update` to a retained span. Unknown spans are ignored.
    fn update_span(&mut self, handle: &SpanHandle, update: impl FnOnce(&mut Span)) {
        if handle.trace_id.is_empty() {
            if let Some(span) = self.orphans.get_mut(&handle.span_id) {
                update(span);
            }
            return;
        }

        let Some(span) = self
            .traces
            .get_mut(&handle.trace_id)
            .and_then(|trace| trace.find_span_mut(&handle.span_id))
        else {
            return;
        };
        update(span);
        self.touch(&handle.trace_id);
    }

    fn evict_over(&mut self, max_traces: usize) {
        while self.traces.len() > max_traces {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(revision) = self.revisions.remove(&oldest) {
                self.changes.remove(&revision);
            }
            if let Some(trace) = self.traces.remove(&oldest) {
                tracing::debug!(
                    trace_id = %trace.trace_id,
                    operation = %trace.operation_name,
                    spans = trace.spans.len(),
                    "Evicted trace over retention cap"
                );
            }
        }

        while self.orphans.len() > max_traces {
            let Some(oldest) = self.orphan_order.pop_front() else {
                break;
            };
            self.orphans.remove(&oldest);
        }
    }
}

/// Builds trace/span trees.
///
/// # Example
///
/// ```
/// use telemetry::{fields, Context, Tracer};
///
/// let tracer = Tracer::new();
/// let (ctx, trace) = tracer.start_trace(&Context::new(), "checkout", fields! {});
/// let (child_ctx, a) = tracer.start_span(&ctx, "reserve stock", fields! {});
/// let (_, b) = tracer.start_span(&child_ctx, "charge card", fields! {});
/// tracer.finish_span(&b);
/// tracer.finish_span(&a);
/// tracer.finish_trace(&trace);
///
/// let trace = tracer.get_trace(trace.trace_id()).unwrap();
/// assert_eq!(trace.span_count, 2);
/// assert_eq!(trace.spans[1].parent_span_id.as_deref(), Some(a.span_id()));
/// ```
#[derive(Debug, Default)]
pub struct Tracer {
    config: TracingConfig,
    registry: RwLock<Registry>,
}

impl Tracer {
    /// Creates a tracer with default configuration (unbounded retention).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracer from configuration.
    ///
    /// `sample_rate` and `max_spans` are kept but not enforced; every trace
    /// and span is recorded. `max_traces`, when set, caps the number of
    /// retained traces.
    #[must_use]
    pub fn from_config(config: TracingConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Configuration this tracer was built with.
    #[must_use]
    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    /// Starts a trace and returns a context in which it is current.
    pub fn start_trace(
        &self,
        ctx: &Context,
        operation_name: &str,
        tags: Fields,
    ) -> (Context, TraceHandle) {
        let trace_id = new_id();
        let trace = Trace::new(trace_id.clone(), operation_name, tags);

        {
            let mut registry = self.write();
            registry.insert_trace(trace);
            if let Some(max_traces) = self.config.max_traces {
                registry.evict_over(max_traces);
            }
        }

        (ctx.enter_trace(&trace_id), TraceHandle { trace_id })
    }

    /// Starts a span under whatever trace and span `ctx` carries.
    ///
    /// The span is appended to its trace's span list. With no trace in
    /// `ctx` the span is an orphan. A span whose trace is no longer retained
    /// is not recorded; operations on its handle are no-ops.
    pub fn start_span(
        &self,
        ctx: &Context,
        operation_name: &str,
        tags: Fields,
    ) -> (Context, SpanHandle) {
        let span_id = new_id();
        let trace_id = ctx.trace_id().unwrap_or_default().to_string();
        let mut span = Span::new(
            span_id.clone(),
            trace_id.clone(),
            ctx.span_id().map(str::to_string),
            operation_name,
        );
        span.tags = tags;

        {
            let mut registry = self.write();
            if trace_id.is_empty() {
                registry.insert_orphan(span);
                if let Some(max_traces) = self.config.max_traces {
                    registry.evict_over(max_traces);
                }
            } else if let Some(trace) = registry.traces.get_mut(&trace_id) {
                trace.spans.push(span);
                registry.touch(&trace_id);
            }
        }

        (ctx.enter_span(&span_id), SpanHandle { span_id, trace_id })
    }

    /// Finishes a span. Only the first call has an effect.
    pub fn finish_span(&self, span: &SpanHandle) {
        self.write().update_span(span, |span| {
            span.finish();
        });
    }

    /// Finishes a trace and snapshots its span count. Only the first call
    /// has an effect.
    pub fn finish_trace(&self, trace: &TraceHandle) {
        let mut registry = self.write();
        let finished = registry
            .traces
            .get_mut(&trace.trace_id)
            .is_some_and(Trace::finish);
        if finished {
            registry.touch(&trace.trace_id);
        }
    }

    /// Sets a tag on a span.
    pub fn add_span_tag(&self, span: &SpanHandle, key: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        let key = key.into();
        self.write().update_span(span, |span| {
            span.tags.insert(key, value);
        });
    }

    /// Appends a structured log entry to a span.
    pub fn add_span_log(&self, span: &SpanHandle, fields: Fields) {
        self.write().update_span(span, |span| {
            span.logs.push(SpanLog::new(fields));
        });
    }

    /// Marks a span as failed: tags `error`, `error.message` and
    /// `error.type`, and logs an `error` event.
    pub fn set_span_error<E>(&self, span: &SpanHandle, err: &E)
    where
        E: Display + ?Sized,
    {
        let message = err.to_string();
        let error_type = std::any::type_name::<E>();

        self.write().update_span(span, |span| {
            span.tags.insert("error".to_string(), Value::Bool(true));
            span.tags
                .insert("error.message".to_string(), Value::from(message.as_str()));
            span.tags
                .insert("error.type".to_string(), Value::from(error_type));

            let mut fields = Fields::new();
            fields.insert("event".to_string(), Value::from("error"));
            fields.insert("message".to_string(), Value::from(message));
            fields.insert("error.type".to_string(), Value::from(error_type));
            span.logs.push(SpanLog::new(fields));
        });
    }

    /// Runs `f` inside a new span.
    ///
    /// `f` receives the span's context so nested spans parent correctly. If
    /// `f` fails, the span is marked with the error. The span is finished
    /// before `f`'s result is returned unchanged.
    pub fn trace_operation<T, E, F>(
        &self,
        ctx: &Context,
        operation_name: &str,
        tags: Fields,
        f: F,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnOnce(&Context) -> Result<T, E>,
    {
        let (span_ctx, span) = self.start_span(ctx, operation_name, tags);
        let result = f(&span_ctx);
        if let Err(err) = &result {
            self.set_span_error(&span, err);
        }
        self.finish_span(&span);
        result
    }

    /// Async form of [`trace_operation`](Self::trace_operation).
    pub async fn trace_operation_async<T, E, F, Fut>(
        &self,
        ctx: &Context,
        operation_name: &str,
        tags: Fields,
        f: F,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let (span_ctx, span) = self.start_span(ctx, operation_name, tags);
        let result = f(span_ctx).await;
        if let Err(err) = &result {
            self.set_span_error(&span, err);
        }
        self.finish_span(&span);
        result
    }

    /// Returns a snapshot of a retained trace.
    #[must_use]
    pub fn get_trace(&self, trace_id: &str) -> Option<Trace> {
        self.read().traces.get(trace_id).cloned()
    }

    /// Returns snapshots of all retained traces in start order.
    #[must_use]
    pub fn get_traces(&self) -> Vec<Trace> {
        let registry = self.read();
        registry
            .order
            .iter()
            .filter_map(|id| registry.traces.get(id))
            .cloned()
            .collect()
    }

    /// Returns snapshots of finished traces in start order.
    #[must_use]
    pub fn finished_traces(&self) -> Vec<Trace> {
        let registry = self.read();
        registry
            .order
            .iter()
            .filter_map(|id| registry.traces.get(id))
            .filter(|trace| trace.is_finished())
            .cloned()
            .collect()
    }

    /// Returns the finished traces changed after `revision`, oldest change
    /// first, together with the tracer's current revision.
    ///
    /// Passing the returned revision on the next call yields only traces
    /// finished or modified in between, such as spans finished or started
    /// after their trace was finished. Pass `0` to get every finished trace.
    #[must_use]
    pub fn finished_since(&self, revision: u64) -> (u64, Vec<Trace>) {
        let registry = self.read();
        let changed = registry
            .changes
            .range(revision.saturating_add(1)..)
            .filter_map(|(_, id)| registry.traces.get(id))
            .filter(|trace| trace.is_finished())
            .cloned()
            .collect();
        (registry.revision, changed)
    }

    /// Returns a snapshot of a retained span.
    #[must_use]
    pub fn get_span(&self, span: &SpanHandle) -> Option<Span> {
        let registry = self.read();
        if span.trace_id.is_empty() {
            return registry.orphans.get(&span.span_id).cloned();
        }
        registry
            .traces
            .get(&span.trace_id)?
            .find_span(&span.span_id)
            .cloned()
    }

    /// Returns snapshots of orphan spans in start order.
    #[must_use]
    pub fn orphan_spans(&self) -> Vec<Span> {
        let registry = self.read();
        registry
            .orphan_order
            .iter()
            .filter_map(|id| registry.orphans.get(id))
            .cloned()
            .collect()
    }

    /// Number of retained traces.
    #[must_use]
    pub fn trace_count(&self) -> usize {
        self.read().traces.len()
    }

    /// Number of retained spans, orphans included.
    #[must_use]
    pub fn span_count(&self) -> usize {
        let registry = self.read();
        registry.orphans.len()
            + registry
                .traces
                .values()
                .map(|trace| trace.spans.len())
                .sum::<usize>()
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
