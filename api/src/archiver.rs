//! Background trace archiving.
//!
//! The tracer keeps traces in memory only. `TraceArchiver` periodically
//! copies finished traces into the configured [`TraceArchive`]. Each pass
//! only reads traces changed since the last successful pass, so spans
//! finished or started after their trace finished reach the archive too.
//!
//! [`TraceArchive`]: telemetry::storage::TraceArchive

use crate::state::AppState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry::storage::ArchiveError;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Background task that archives finished traces.
pub struct TraceArchiver {
    state: AppState,
    interval_duration: Duration,
    /// Tracer revision covered by the last successful pass.
    archived_revision: AtomicU64,
}

impl TraceArchiver {
    /// Creates a new archiver.
    ///
    /// # Arguments
    ///
    /// * `state` - Application state holding the tracer and the archive
    /// * `interval_duration` - How often to archive
    #[must_use]
    pub fn new(state: AppState, interval_duration: Duration) -> Self {
        Self {
            state,
            interval_duration,
            archived_revision: AtomicU64::new(0),
        }
    }

    /// Archives finished traces that changed since the last successful pass.
    ///
    /// Returns the number of traces newly archived or replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive rejects the batch. The same changes
    /// are offered again on the next pass.
    pub fn archive_once(&self) -> Result<usize, ArchiveError> {
        let since = self.archived_revision.load(Ordering::Acquire);
        let (revision, changed) = self.state.observability().tracer().finished_since(since);
        let archived = if changed.is_empty() {
            0
        } else {
            self.state.archive().archive(changed)?
        };
        self.archived_revision.store(revision, Ordering::Release);
        Ok(archived)
    }

    /// Starts the archiving loop.
    ///
    /// Runs until the task is aborted.
    pub async fn run(self: Arc<Self>) {
        let mut tick = interval(self.interval_duration);

        loop {
            tick.tick().await;

            match self.archive_once() {
                Ok(0) => {}
                Ok(archived) => {
                    tracing::info!(
                        archived,
                        total = self.state.archive().count().unwrap_or_default(),
                        "Archived finished traces"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to archive traces");
                }
            }
        }
    }

    /// Spawns the archiving loop on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(Arc::new(self).run())
    }
}
