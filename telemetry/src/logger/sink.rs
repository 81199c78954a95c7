//! Log sinks.
//!
//! The logger builds one canonical `LogEntry` per call and hands it to a
//! sink. Formatting and destination are the sink's business.

use crate::models::{LogEntry, LogLevel};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::Write;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Destination for emitted log records.
///
/// Implementations must be thread-safe and must not fail: a sink that cannot
/// deliver a record drops it.
pub trait LogSink: Send + Sync {
    /// Writes one record.
    fn write(&self, entry: &LogEntry);

    /// Flushes buffered output. Called before the process exits on `fatal`.
    fn flush(&self) {}
}

/// Output format for console logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line (for production/log aggregation).
    #[default]
    Json,
    /// Human-readable lines (for development).
    Human,
}

/// Error returned when a string does not name a log format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown log format: '{0}' (expected 'json' or 'human')")]
pub struct ParseFormatError(pub String);

impl FromStr for LogFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "human" | "text" | "pretty" => Ok(Self::Human),
            _ => Err(ParseFormatError(s.to_string())),
        }
    }
}

impl LogFormat {
    /// Renders a record in this format.
    #[must_use]
    pub fn render(self, entry: &LogEntry) -> String {
        match self {
            Self::Json => entry.to_json(),
            Self::Human => entry.to_human(),
        }
    }
}

/// Writes records to stdout, or stderr for `error` and `fatal`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    format: LogFormat,
}

impl ConsoleSink {
    /// Creates a console sink with the given format.
    #[must_use]
    pub fn new(format: LogFormat) -> Self {
        Self { format }
    }
}

impl LogSink for ConsoleSink {
    fn write(&self, entry: &LogEntry) {
        let line = self.format.render(entry);
        // Write failures (closed pipe etc.) are dropped; logging never fails.
        if entry.level >= LogLevel::Error {
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        } else {
            let _ = writeln!(std::io::stdout().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}

/// Keeps the most recent records in memory.
///
/// When full, the oldest record is dropped. Used by the operator API to
/// serve recent logs and by tests to inspect emitted records.
#[derive(Debug)]
pub struct MemorySink {
    entries: RwLock<VecDeque<LogEntry>>,
    capacity: usize,
}

impl MemorySink {
    /// Default number of retained records.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a sink retaining at most `capacity` records (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY))),
            capacity,
        }
    }

    /// Creates a sink wrapped in an Arc.
    #[must_use]
    pub fn new_shared(capacity: usize) -> Arc<Self> {
        Arc::new(Self::with_capacity(capacity))
    }

    /// Returns all retained records, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    /// Returns up to `limit` of the newest records, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no records are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained records.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops all retained records.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: &LogEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
    }
}

/// Forwards records to the `tracing` subscriber as events.
///
/// `fatal` records are emitted at `ERROR` with `fatal = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, entry: &LogEntry) {
        let fields = if entry.fields.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&entry.fields).unwrap_or_default()
        };
        let request_id = entry.request_id.as_deref().unwrap_or_default();
        let trace_id = entry.trace_id.as_deref().unwrap_or_default();
        let span_id = entry.span_id.as_deref().unwrap_or_default();
        let error = entry
            .error
            .as_ref()
            .map(|e| e.message.as_str())
            .unwrap_or_default();

        macro_rules! forward {
            ($level:ident) => {
                tracing::$level!(
                    target: "storewatch",
                    service = %entry.service,
                    version = %entry.version,
                    request_id,
                    trace_id,
                    span_id,
                    fields = %fields,
                    error,
                    fatal = entry.level == LogLevel::Fatal,
                    "{}",
                    entry.message
                )
            };
        }

        match entry.level {
            LogLevel::Debug => forward!(debug),
            LogLevel::Info => forward!(info),
            LogLevel::Warn => forward!(warn),
            LogLevel::Error | LogLevel::Fatal => forward!(error),
        }
    }
}

/// Forwards every record to each of several sinks.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
    /// Creates a fan-out over the given sinks.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    /// Adds another sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl LogSink for FanoutSink {
    fn write(&self, entry: &LogEntry) {
        for sink in &self.sinks {
            sink.write(entry);
        }
    }

    fn flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn write(&self, _entry: &LogEntry) {}
}
