//! Storage traits and implementations.
//!
//! Collaborators that consume snapshots produced by the core: an alert store
//! and an archive of finished traces. Both are traits so durable backends
//! can replace the in-memory implementations.

pub mod alert_store;
pub mod archive;

pub use alert_store::{AlertQuery, AlertStore, AlertStoreError, InMemoryAlertStore};
pub use archive::{ArchiveError, InMemoryTraceArchive, TraceArchive};
