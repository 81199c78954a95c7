//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use crate::config::Config;
use std::sync::Arc;
use telemetry::storage::{AlertStore, InMemoryAlertStore, InMemoryTraceArchive, TraceArchive};
use telemetry::{
    ConsoleSink, FanoutSink, LogLevel, LogSink, MemorySink, Observability, ObservabilityConfig,
    TracingSink,
};

/// Application state shared across all request handlers.
///
/// Cloning is cheap; every clone shares the same telemetry components and
/// stores.
#[derive(Clone)]
pub struct AppState {
    /// Logger, metrics collector and tracer.
    observability: Observability,
    /// Recent structured log records.
    log_buffer: Arc<MemorySink>,
    /// The alert storage backend.
    alerts: Arc<dyn AlertStore>,
    /// Archive of finished traces.
    archive: Arc<dyn TraceArchive>,
}

impl AppState {
    /// Creates a new application state from its parts.
    pub fn new(
        observability: Observability,
        log_buffer: Arc<MemorySink>,
        alerts: Arc<dyn AlertStore>,
        archive: Arc<dyn TraceArchive>,
    ) -> Self {
        Self {
            observability,
            log_buffer,
            alerts,
            archive,
        }
    }

    /// Creates the state for a running server.
    ///
    /// Structured records go to the log buffer and to either the console or
    /// the `tracing` subscriber.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let log_buffer = MemorySink::new_shared(config.log_buffer);
        let output: Arc<dyn LogSink> = if config.log_to_tracing {
            Arc::new(TracingSink)
        } else {
            Arc::new(ConsoleSink::new(config.observability.logging.format))
        };
        let sink = FanoutSink::new(vec![output]).with_sink(log_buffer.clone());

        Self::new(
            Observability::from_config(&config.observability, Arc::new(sink)),
            log_buffer,
            InMemoryAlertStore::new_shared(),
            InMemoryTraceArchive::new_shared(),
        )
    }

    /// Creates a new application state with in-memory stores.
    ///
    /// Records only go to the log buffer. This is useful for development
    /// and testing.
    #[must_use]
    pub fn with_in_memory_store() -> Self {
        let mut config =
            ObservabilityConfig::for_service("storewatch-api", env!("CARGO_PKG_VERSION"));
        config.logging.level = LogLevel::Debug;

        let log_buffer = MemorySink::new_shared(MemorySink::DEFAULT_CAPACITY);
        Self::new(
            Observability::from_config(&config, log_buffer.clone()),
            log_buffer,
            InMemoryAlertStore::new_shared(),
            InMemoryTraceArchive::new_shared(),
        )
    }

    /// Returns the telemetry facade.
    #[must_use]
    pub fn observability(&self) -> &Observability {
        &self.observability
    }

    /// Returns the recent log buffer.
    #[must_use]
    pub fn log_buffer(&self) -> &MemorySink {
        self.log_buffer.as_ref()
    }

    /// Returns a reference to the alert store.
    #[must_use]
    pub fn alerts(&self) -> &dyn AlertStore {
        self.alerts.as_ref()
    }

    /// Returns a reference to the trace archive.
    #[must_use]
    pub fn archive(&self) -> &dyn TraceArchive {
        self.archive.as_ref()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry::models::Alert;
    use telemetry::{tags, Context};

    #[test]
    fn test_app_state_with_in_memory_store() {
        let state = AppState::with_in_memory_store();

        state
            .observability()
            .logger()
            .info(&Context::new(), "hello", &[]);
        assert_eq!(state.log_buffer().len(), 1);

        state
            .alerts()
            .insert(Alert::new("Slow checkout", "checkout", "p99 > 2s"))
            .unwrap();
        assert_eq!(state.alerts().count().unwrap(), 1);
        assert_eq!(state.archive().count().unwrap(), 0);
    }

    #[test]
    fn test_app_state_is_clone() {
        let state = AppState::with_in_memory_store();
        let state2 = state.clone();

        state.observability().metrics().increment("orders", tags! {});
        state
            .alerts()
            .insert(Alert::new("Low stock", "catalog", "qty < 5"))
            .unwrap();

        assert_eq!(state2.observability().metrics().len(), 1);
        assert_eq!(state2.alerts().count().unwrap(), 1);
    }

    #[test]
    fn test_from_config_uses_buffer_capacity() {
        let config = Config {
            log_buffer: 3,
            log_to_tracing: true,
            ..Config::default()
        };
        let state = AppState::from_config(&config);

        for i in 0..5 {
            state
                .observability()
                .logger()
                .info(&Context::new(), &format!("m{i}"), &[]);
        }

        assert_eq!(state.log_buffer().len(), 3);
        assert_eq!(state.log_buffer().capacity(), 3);
    }
}
