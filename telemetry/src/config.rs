//! Observability configuration.
//!
//! Set once at construction and never hot-reloaded. Values come from
//! defaults, serde (e.g. a config file) or `STOREWATCH_*` environment
//! variables:
//!
//! - `STOREWATCH_SERVICE_NAME` (default: "storewatch")
//! - `STOREWATCH_SERVICE_VERSION` (default: crate version)
//! - `STOREWATCH_LOG_LEVEL`: debug|info|warn|error|fatal (default: info)
//! - `STOREWATCH_LOG_FORMAT`: json|human (default: json)
//! - `STOREWATCH_DEFAULT_TAGS`: `k=v,k2=v2` (default: none)
//! - `STOREWATCH_TRACE_SAMPLE_RATE`: 0.0..=1.0 (default: 1.0, not enforced)
//! - `STOREWATCH_TRACE_MAX_SPANS` (default: 1000, not enforced)
//! - `STOREWATCH_TRACE_MAX_TRACES` (default: unbounded)

use crate::logger::LogFormat;
use crate::models::{LogLevel, Tags};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed.
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidVar {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },

    /// The assembled configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Logger settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum emitted level.
    pub level: LogLevel,
    /// Console output format.
    pub format: LogFormat,
}

/// Metrics collector settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Tags merged into every sample; call-site tags win on collision.
    pub default_tags: Tags,
}

/// Tracer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TracingConfig {
    /// Fraction of traces to keep. Reserved: every trace is recorded.
    #[validate(range(min = 0.0, max = 1.0))]
    pub sample_rate: f64,

    /// Maximum spans per trace. Reserved: not enforced.
    #[validate(range(min = 1))]
    pub max_spans: usize,

    /// Maximum retained traces; the oldest is evicted past the cap.
    /// `None` keeps everything.
    #[validate(range(min = 1))]
    pub max_traces: Option<usize>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1.0,
            max_spans: 1000,
            max_traces: None,
        }
    }
}

/// Complete observability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Service name stamped on every record.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Service version stamped on every record.
    #[validate(length(min = 1, message = "Service version cannot be empty"))]
    pub service_version: String,

    /// Logger settings.
    pub logging: LoggingConfig,

    /// Metrics settings.
    pub metrics: MetricsConfig,

    /// Tracer settings.
    #[validate(nested)]
    pub tracing: TracingConfig,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "storewatch".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            tracing: TracingConfig::default(),
        }
    }
}

impl ObservabilityConfig {
    /// Creates a default configuration for the given service.
    #[must_use]
    pub fn for_service(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            service_version: version.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from `STOREWATCH_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed, or if the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("STOREWATCH_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Some(version) = lookup("STOREWATCH_SERVICE_VERSION") {
            config.service_version = version;
        }
        if let Some(level) = parse_var(&lookup, "STOREWATCH_LOG_LEVEL")? {
            config.logging.level = level;
        }
        if let Some(format) = parse_var(&lookup, "STOREWATCH_LOG_FORMAT")? {
            config.logging.format = format;
        }
        if let Some(raw) = lookup("STOREWATCH_DEFAULT_TAGS") {
            config.metrics.default_tags =
                parse_tags(&raw).map_err(|reason| ConfigError::InvalidVar {
                    var: "STOREWATCH_DEFAULT_TAGS",
                    value: raw.clone(),
                    reason,
                })?;
        }
        if let Some(rate) = parse_var(&lookup, "STOREWATCH_TRACE_SAMPLE_RATE")? {
            config.tracing.sample_rate = rate;
        }
        if let Some(max_spans) = parse_var(&lookup, "STOREWATCH_TRACE_MAX_SPANS")? {
            config.tracing.max_spans = max_spans;
        }
        if let Some(max_traces) = parse_var(&lookup, "STOREWATCH_TRACE_MAX_TRACES")? {
            config.tracing.max_traces = Some(max_traces);
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidVar {
                    var,
                    value: value.clone(),
                    reason: e.to_string(),
                })
        })
        .transpose()
}

/// Parses `k=v,k2=v2` into a tag set. Blank input yields no tags.
///
/// # Errors
///
/// Returns a description of the first malformed pair.
pub fn parse_tags(raw: &str) -> Result<Tags, String> {
    let mut tags = Tags::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(format!("expected key=value, got '{pair}'"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty tag key in '{pair}'"));
        }
        tags.insert(key.to_string(), value.trim().to_string());
    }
    Ok(tags)
}
