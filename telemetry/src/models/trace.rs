//! Trace and span data models.
//!
//! Records are owned by the tracer's registry and mutated in place there;
//! everything handed out to callers is a snapshot clone.

use super::log::Fields;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A timestamped structured entry recorded on a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanLog {
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// Entry fields.
    #[serde(default)]
    pub fields: Fields,
}

impl SpanLog {
    /// Creates a span log entry stamped with the current time.
    #[must_use]
    pub fn new(fields: Fields) -> Self {
        Self {
            timestamp: Utc::now(),
            fields,
        }
    }
}

/// A timed unit of work, possibly nested under a parent span.
///
/// `trace_id` is empty for orphan spans, which were started from a context
/// carrying no trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Unique span identifier.
    pub span_id: String,

    /// Owning trace id (empty for orphan spans).
    #[serde(default)]
    pub trace_id: String,

    /// Parent span id (None for spans started directly under a trace).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,

    /// Operation name.
    pub operation_name: String,

    /// When the span started.
    pub start_time: DateTime<Utc>,

    /// When the span finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// `end_time - start_time`, set on finish.
    #[serde(
        rename = "duration_us",
        with = "duration_micros",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,

    /// Span tags.
    #[serde(default)]
    pub tags: Fields,

    /// Structured log entries in recording order.
    #[serde(default)]
    pub logs: Vec<SpanLog>,

    #[serde(skip)]
    started: Option<Instant>,
}

impl Span {
    /// Creates an unfinished span starting now.
    #[must_use]
    pub fn new(
        span_id: impl Into<String>,
        trace_id: impl Into<String>,
        parent_span_id: Option<String>,
        operation_name: impl Into<String>,
    ) -> Self {
        Self {
            span_id: span_id.into(),
            trace_id: trace_id.into(),
            parent_span_id,
            operation_name: operation_name.into(),
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            tags: Fields::new(),
            logs: Vec::new(),
            started: Some(Instant::now()),
        }
    }

    /// Returns true if the span was started outside any trace.
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.trace_id.is_empty()
    }

    /// Returns true once the span has been finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Returns true if the span was tagged as failed.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.tags.get("error") == Some(&serde_json::Value::Bool(true))
    }

    /// Sets end time and duration. Returns false if already finished.
    pub(crate) fn finish(&mut self) -> bool {
        if self.end_time.is_some() {
            return false;
        }
        let (end, duration) = elapsed_since(self.start_time, self.started);
        self.end_time = Some(end);
        self.duration = Some(duration);
        true
    }
}

/// The root timed grouping of the spans of one logical operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Unique trace identifier.
    pub trace_id: String,

    /// Operation name.
    pub operation_name: String,

    /// When the trace started.
    pub start_time: DateTime<Utc>,

    /// When the trace finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// `end_time - start_time`, set on finish.
    #[serde(
        rename = "duration_us",
        with = "duration_micros",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,

    /// Trace tags.
    #[serde(default)]
    pub tags: Fields,

    /// Spans in start order.
    #[serde(default)]
    pub spans: Vec<Span>,

    /// Number of spans at the moment the trace was finished.
    ///
    /// This is a snapshot: spans started afterwards still land in `spans`
    /// but are not counted here.
    #[serde(default)]
    pub span_count: usize,

    #[serde(skip)]
    started: Option<Instant>,
}

impl Trace {
    /// Creates an unfinished trace starting now.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, operation_name: impl Into<String>, tags: Fields) -> Self {
        Self {
            trace_id: trace_id.into(),
            operation_name: operation_name.into(),
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            tags,
            spans: Vec::new(),
            span_count: 0,
            started: Some(Instant::now()),
        }
    }

    /// Returns true once the trace has been finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Looks up a span of this trace by id.
    #[must_use]
    pub fn find_span(&self, span_id: &str) -> Option<&Span> {
        self.spans.iter().find(|s| s.span_id == span_id)
    }

    pub(crate) fn find_span_mut(&mut self, span_id: &str) -> Option<&mut Span> {
        self.spans.iter_mut().find(|s| s.span_id == span_id)
    }

    /// Returns the spans started directly under the trace.
    #[must_use]
    pub fn root_spans(&self) -> Vec<&Span> {
        self.spans
            .iter()
            .filter(|s| s.parent_span_id.is_none())
            .collect()
    }

    /// Returns the direct children of a span.
    #[must_use]
    pub fn children_of(&self, span_id: &str) -> Vec<&Span> {
        self.spans
            .iter()
            .filter(|s| s.parent_span_id.as_deref() == Some(span_id))
            .collect()
    }

    /// Sets end time, duration and the span-count snapshot. Returns false if
    /// already finished.
    pub(crate) fn finish(&mut self) -> bool {
        if self.end_time.is_some() {
            return false;
        }
        let (end, duration) = elapsed_since(self.start_time, self.started);
        self.end_time = Some(end);
        self.duration = Some(duration);
        self.span_count = self.spans.len();
        true
    }
}

/// Derives the end timestamp from the monotonic clock so `end >= start` holds
/// even if the wall clock steps backwards.
fn elapsed_since(start: DateTime<Utc>, started: Option<Instant>) -> (DateTime<Utc>, Duration) {
    let elapsed = started
        .map(|instant| instant.elapsed())
        .and_then(|elapsed| Duration::from_std(elapsed).ok())
        .unwrap_or_else(Duration::zero);
    let end = start.checked_add_signed(elapsed).unwrap_or(start);
    (end, end - start)
}

/// Serializes an optional duration as whole microseconds.
mod duration_micros {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value.and_then(|d| d.num_microseconds()) {
            Some(us) => serializer.serialize_some(&us),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<i64>::deserialize(deserializer)?.map(Duration::microseconds))
    }
}
