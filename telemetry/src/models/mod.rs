//! Data models for the Storewatch telemetry core.
//!
//! This module contains the records produced by the logger, the metrics
//! collector and the tracer, plus the alert record used by collaborators.

pub mod alert;
pub mod log;
pub mod metric;
pub mod trace;

pub use alert::{Alert, AlertSeverity, AlertStatus, AlertValidationError};
pub use log::{ErrorDetail, Fields, LogEntry, LogLevel, ParseLevelError};
pub use metric::{
    canonical_tags, identity_key, merge_tags, Metric, MetricIdentity, MetricType, Tags,
};
pub use trace::{Span, SpanLog, Trace};
