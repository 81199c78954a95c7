//! Log record data model.
//!
//! Defines the canonical `LogEntry` produced by the structured logger and
//! handed to log sinks.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Structured field map attached to log records and span logs.
pub type Fields = HashMap<String, serde_json::Value>;

/// Log severity level.
///
/// Levels are totally ordered: `Debug < Info < Warn < Error < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational messages.
    Info,
    /// Warning conditions.
    Warn,
    /// Error conditions.
    Error,
    /// Unrecoverable conditions; the process terminates after emission.
    Fatal,
}

impl LogLevel {
    /// All levels in ascending order.
    pub const ALL: [LogLevel; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
    ];

    /// Numeric rank of the level, used for threshold comparisons.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Debug => 0,
            Self::Info => 1,
            Self::Warn => 2,
            Self::Error => 3,
            Self::Fatal => 4,
        }
    }

    /// Returns the lower-case name of the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// Error returned when a string does not name a log level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown log level: '{0}'")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Error detail block attached to a log record.
///
/// Building one never fails: whatever the error value renders to becomes the
/// message, and a missing backtrace simply leaves `stack` empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Type name of the error value.
    #[serde(rename = "type")]
    pub error_type: String,

    /// The error's display message.
    pub message: String,

    /// Messages of the error's source chain, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,

    /// Captured backtrace text, present only when backtraces are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorDetail {
    /// Creates an error detail with an explicit type name and message.
    #[must_use]
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            causes: Vec::new(),
            stack: None,
        }
    }

    /// Builds an error detail from a `std::error::Error`, walking its source chain.
    #[must_use]
    pub fn from_error<E>(err: &E) -> Self
    where
        E: StdError + ?Sized,
    {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            error_type: std::any::type_name::<E>().to_string(),
            message: err.to_string(),
            causes,
            stack: capture_stack(),
        }
    }

    /// Builds an error detail from any displayable error value.
    #[must_use]
    pub fn from_display<E>(err: &E) -> Self
    where
        E: fmt::Display + ?Sized,
    {
        Self {
            error_type: std::any::type_name::<E>().to_string(),
            message: err.to_string(),
            causes: Vec::new(),
            stack: capture_stack(),
        }
    }
}

fn capture_stack() -> Option<String> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

/// A single structured log record.
///
/// Records are created by the logger and handed to a sink exactly once; they
/// are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when the record was emitted.
    pub timestamp: DateTime<Utc>,

    /// Severity level.
    pub level: LogLevel,

    /// The log message.
    pub message: String,

    /// Name of the emitting service.
    pub service: String,

    /// Version of the emitting service.
    pub version: String,

    /// Request correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Acting user id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Tenant id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Trace id for distributed tracing correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// Span id for distributed tracing correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,

    /// Structured fields.
    #[serde(default)]
    pub fields: Fields,

    /// Error detail, if the record describes a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl LogEntry {
    /// Creates a record with the current timestamp and no correlation data.
    #[must_use]
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        service: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            service: service.into(),
            version: version.into(),
            request_id: None,
            user_id: None,
            tenant_id: None,
            trace_id: None,
            span_id: None,
            fields: Fields::new(),
            error: None,
        }
    }

    /// Formats the record as a single JSON line.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }

    /// Formats the record for humans.
    ///
    /// Fields are rendered in key order so the output is stable.
    #[must_use]
    pub fn to_human(&self) -> String {
        let mut s = format!(
            "{} {:<5} [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level.as_str().to_ascii_uppercase(),
            self.service,
            self.message
        );

        let ids = [
            ("request_id", &self.request_id),
            ("user_id", &self.user_id),
            ("tenant_id", &self.tenant_id),
            ("trace_id", &self.trace_id),
            ("span_id", &self.span_id),
        ];
        for (key, value) in ids {
            if let Some(value) = value {
                s.push_str(&format!(" {key}={value}"));
            }
        }

        if !self.fields.is_empty() {
            let mut keys: Vec<&String> = self.fields.keys().collect();
            keys.sort_unstable();
            s.push_str(" |");
            for key in keys {
                s.push_str(&format!(" {}={}", key, self.fields[key]));
            }
        }

        if let Some(ref err) = self.error {
            s.push_str(&format!(" error=\"{}\" ({})", err.message, err.error_type));
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("payment gateway unreachable")]
    struct GatewayError {
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);

        for pair in LogLevel::ALL.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(" fatal ".parse::<LogLevel>(), Ok(LogLevel::Fatal));
        assert_eq!(
            "verbose".parse::<LogLevel>(),
            Err(ParseLevelError("verbose".to_string()))
        );
    }

    #[test]
    fn test_level_display_round_trips() {
        for level in LogLevel::ALL {
            assert_eq!(level.to_string().parse::<LogLevel>(), Ok(level));
        }
    }

    #[test]
    fn test_error_detail_from_error_walks_sources() {
        let err = GatewayError {
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
        };

        let detail = ErrorDetail::from_error(&err);

        assert_eq!(detail.message, "payment gateway unreachable");
        assert!(detail.error_type.ends_with("GatewayError"));
        assert_eq!(detail.causes, vec!["connect timed out".to_string()]);
    }

    #[test]
    fn test_error_detail_from_display() {
        let detail = ErrorDetail::from_display("coupon expired");
        assert_eq!(detail.message, "coupon expired");
        assert_eq!(detail.error_type, "str");
        assert!(detail.causes.is_empty());
    }

    #[test]
    fn test_entry_serialization_omits_missing_ids() {
        let mut entry = LogEntry::new(LogLevel::Info, "cart updated", "cart", "1.2.0");
        entry.request_id = Some("req-1".to_string());

        let json = entry.to_json();

        assert!(json.contains("\"level\":\"info\""));
        assert!(json.contains("\"request_id\":\"req-1\""));
        assert!(!json.contains("trace_id"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_entry_to_human_sorts_fields() {
        let mut entry = LogEntry::new(LogLevel::Warn, "low stock", "catalog", "1.0.0");
        entry.fields.insert("sku".to_string(), serde_json::json!("A-1"));
        entry.fields.insert("qty".to_string(), serde_json::json!(2));

        let line = entry.to_human();

        assert!(line.contains("WARN  [catalog] low stock"));
        assert!(line.ends_with("| qty=2 sku=\"A-1\""));
    }
}
