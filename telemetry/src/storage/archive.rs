//! Archive of finished traces.
//!
//! The tracer never calls out to storage itself. An archiving collaborator
//! polls `Tracer::finished_since` and hands the snapshots to a
//! `TraceArchive`. A trace can change after it finished (a span still open
//! at that moment is finished later, or a late span is started under it), so
//! the archive keeps the latest snapshot per trace id.

use crate::models::Trace;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Failed to acquire lock on the archive.
    #[error("Failed to acquire lock on trace archive")]
    LockError,

    /// Trace not found.
    #[error("Trace not archived: {0}")]
    NotFound(String),

    /// Only finished traces can be archived.
    #[error("Trace is not finished: {0}")]
    Unfinished(String),
}

/// Trait for trace archive implementations.
///
/// Archiving upserts per trace id: a snapshot replaces an archived trace with
/// the same id unless both are equal. Implementations must be thread-safe
/// (Send + Sync).
pub trait TraceArchive: Send + Sync {
    /// Archives finished traces and returns how many were new or replaced a
    /// different archived snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if a trace is unfinished or the operation fails.
    /// Nothing is stored when an error is returned.
    fn archive(&self, traces: Vec<Trace>) -> Result<usize, ArchiveError>;

    /// Returns true if a trace with this id has been archived.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn contains(&self, trace_id: &str) -> Result<bool, ArchiveError>;

    /// Gets an archived trace by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the trace is not archived or the operation fails.
    fn get(&self, trace_id: &str) -> Result<Trace, ArchiveError>;

    /// Lists archived traces, most recently started first.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn list(&self, limit: Option<usize>) -> Result<Vec<Trace>, ArchiveError>;

    /// Returns the number of archived traces.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn count(&self) -> Result<usize, ArchiveError>;
}

/// In-memory trace archive.
#[derive(Debug, Default)]
pub struct InMemoryTraceArchive {
    traces: Arc<RwLock<HashMap<String, Trace>>>,
}

impl InMemoryTraceArchive {
    /// Creates a new empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new archive wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl TraceArchive for InMemoryTraceArchive {
    fn archive(&self, traces: Vec<Trace>) -> Result<usize, ArchiveError> {
        if let Some(open) = traces.iter().find(|t| !t.is_finished()) {
            return Err(ArchiveError::Unfinished(open.trace_id.clone()));
        }

        let mut archived = self.traces.write().map_err(|_| ArchiveError::LockError)?;
        let mut stored = 0;
        for trace in traces {
            if archived.get(&trace.trace_id) != Some(&trace) {
                archived.insert(trace.trace_id.clone(), trace);
                stored += 1;
            }
        }
        Ok(stored)
    }

    fn contains(&self, trace_id: &str) -> Result<bool, ArchiveError> {
        let archived = self.traces.read().map_err(|_| ArchiveError::LockError)?;
        Ok(archived.contains_key(trace_id))
    }

    fn get(&self, trace_id: &str) -> Result<Trace, ArchiveError> {
        let archived = self.traces.read().map_err(|_| ArchiveError::LockError)?;
        archived
            .get(trace_id)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(trace_id.to_string()))
    }

    fn list(&self, limit: Option<usize>) -> Result<Vec<Trace>, ArchiveError> {
        let archived = self.traces.read().map_err(|_| ArchiveError::LockError)?;

        let mut traces: Vec<Trace> = archived.values().cloned().collect();
        traces.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        traces.truncate(limit.unwrap_or(usize::MAX));
        Ok(traces)
    }

    fn count(&self) -> Result<usize, ArchiveError> {
        let archived = self.traces.read().map_err(|_| ArchiveError::LockError)?;
        Ok(archived.len())
    }
}
