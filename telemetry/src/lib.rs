//! Storewatch Telemetry Core
//!
//! In-process observability runtime for the storefront backend: a structured
//! logger, an identity-keyed metrics collector and a tracer that correlates
//! spans through an explicit call context.
//!
//! # Modules
//!
//! - [`context`] - Correlation context threaded through instrumented calls
//! - [`logger`] - Leveled, contextual structured logging and log sinks
//! - [`metrics`] - Thread-safe metric sample store
//! - [`tracer`] - Trace/span tree builder
//! - [`facade`] - Log + metric + trace in one call
//! - [`config`] - Configuration with environment overrides
//! - [`models`] - Records produced by the components above
//! - [`storage`] - Alert store and trace archive collaborators
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use telemetry::{tags, Context, MemorySink, Observability, ObservabilityConfig};
//!
//! let sink = Arc::new(MemorySink::default());
//! let obs = Observability::from_config(
//!     &ObservabilityConfig::for_service("cart", "1.0.0"),
//!     sink.clone(),
//! );
//!
//! let (ctx, trace) = obs.tracer().start_trace(&Context::new(), "GET /cart", Default::default());
//! let total: Result<u32, std::io::Error> =
//!     obs.observe(&ctx, "load cart", tags! { "tenant" => "acme" }, |_| Ok(42));
//! obs.tracer().finish_trace(&trace);
//!
//! assert_eq!(total.unwrap(), 42);
//! assert_eq!(obs.tracer().get_trace(trace.trace_id()).unwrap().span_count, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod macros;

pub mod config;
pub mod context;
pub mod facade;
pub mod logger;
pub mod metrics;
pub mod models;
pub mod storage;
pub mod tracer;

pub use config::{ConfigError, LoggingConfig, MetricsConfig, ObservabilityConfig, TracingConfig};
pub use context::Context;
pub use facade::Observability;
pub use logger::{
    ConsoleSink, FanoutSink, LogFormat, LogSink, MemorySink, NoopSink, StructuredLogger,
    TracingSink,
};
pub use metrics::MetricsCollector;
pub use models::{Fields, LogLevel, Tags};
pub use tracer::{SpanHandle, TraceHandle, Tracer};

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde_json;

#[doc(hidden)]
pub mod __private {
    pub use serde_json::json;
}
