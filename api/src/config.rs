//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context as _, Result};
use std::net::SocketAddr;
use std::time::Duration;
use telemetry::ObservabilityConfig;

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `STOREWATCH_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `STOREWATCH_PORT`: The port to listen on (default: 8080)
/// - `STOREWATCH_ARCHIVE_INTERVAL_SECS`: How often finished traces are archived (default: 30)
/// - `STOREWATCH_LOG_BUFFER`: Number of recent log records served by `/api/v1/logs` (default: 1024)
/// - `STOREWATCH_LOG_TO_TRACING`: Forward structured records to the `tracing`
///   subscriber instead of writing them to the console (default: false)
///
/// The `STOREWATCH_*` telemetry variables are read by [`ObservabilityConfig::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Interval between archiver runs.
    pub archive_interval: Duration,
    /// Capacity of the in-memory log buffer.
    pub log_buffer: usize,
    /// Route structured records through `tracing` instead of the console.
    pub log_to_tracing: bool,
    /// Logger, metrics and tracer settings.
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set but cannot be parsed, or if
    /// the telemetry configuration is invalid.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let host = std::env::var("STOREWATCH_HOST").unwrap_or(defaults.host);
        let port = parse_env("STOREWATCH_PORT")?.unwrap_or(defaults.port);
        let archive_interval = parse_env("STOREWATCH_ARCHIVE_INTERVAL_SECS")?
            .map_or(defaults.archive_interval, Duration::from_secs);
        let log_buffer = parse_env("STOREWATCH_LOG_BUFFER")?.unwrap_or(defaults.log_buffer);
        let log_to_tracing =
            parse_env("STOREWATCH_LOG_TO_TRACING")?.unwrap_or(defaults.log_to_tracing);

        if archive_interval.is_zero() {
            anyhow::bail!("STOREWATCH_ARCHIVE_INTERVAL_SECS must be greater than zero");
        }

        let observability = ObservabilityConfig::from_env()?;

        Ok(Self {
            host,
            port,
            archive_interval,
            log_buffer,
            log_to_tracing,
            observability,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            archive_interval: Duration::from_secs(30),
            log_buffer: 1024,
            log_to_tracing: false,
            observability: ObservabilityConfig::default(),
        }
    }
}

fn parse_env<T>(var: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(var)
        .ok()
        .map(|value| value.trim().parse::<T>())
        .transpose()
        .with_context(|| format!("Invalid value for {var}"))
}
