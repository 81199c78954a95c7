//! Alert storage trait and in-memory implementation.

use crate::models::{Alert, AlertSeverity, AlertStatus};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during alert store operations.
#[derive(Debug, Error)]
pub enum AlertStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on alert store")]
    LockError,

    /// Alert not found.
    #[error("Alert not found: {0}")]
    NotFound(String),

    /// The alert failed validation.
    #[error("Invalid alert: {0}")]
    Invalid(String),
}

/// Filter for listing alerts.
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    /// Filter by originating service.
    pub service: Option<String>,

    /// Filter by status.
    pub status: Option<AlertStatus>,

    /// Filter by severity.
    pub severity: Option<AlertSeverity>,

    /// Maximum number of alerts to return.
    pub limit: Option<usize>,
}

impl AlertQuery {
    /// Creates an empty query (matches all alerts).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service filter.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the status filter.
    #[must_use]
    pub fn with_status(mut self, status: AlertStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the severity filter.
    #[must_use]
    pub fn with_severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, alert: &Alert) -> bool {
        self.service.as_ref().map_or(true, |s| &alert.service == s)
            && self.status.map_or(true, |s| alert.status == s)
            && self.severity.map_or(true, |s| alert.severity == s)
    }
}

/// Trait for alert storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait AlertStore: Send + Sync {
    /// Validates and stores an alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert is invalid or the operation fails.
    fn insert(&self, alert: Alert) -> Result<Alert, AlertStoreError>;

    /// Gets an alert by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert is not found or the operation fails.
    fn get(&self, id: &str) -> Result<Alert, AlertStoreError>;

    /// Lists alerts matching the query, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn list(&self, query: &AlertQuery) -> Result<Vec<Alert>, AlertStoreError>;

    /// Moves an alert to a new status and returns the updated alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert is not found or the operation fails.
    fn update_status(&self, id: &str, status: AlertStatus) -> Result<Alert, AlertStoreError>;

    /// Returns the number of stored alerts.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn count(&self) -> Result<usize, AlertStoreError>;
}

/// In-memory alert store.
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    alerts: Arc<RwLock<HashMap<String, Alert>>>,
}

impl InMemoryAlertStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl AlertStore for InMemoryAlertStore {
    fn insert(&self, alert: Alert) -> Result<Alert, AlertStoreError> {
        alert
            .validate_alert()
            .map_err(|e| AlertStoreError::Invalid(e.to_string()))?;

        let mut alerts = self.alerts.write().map_err(|_| AlertStoreError::LockError)?;
        alerts.insert(alert.id.clone(), alert.clone());
        Ok(alert)
    }

    fn get(&self, id: &str) -> Result<Alert, AlertStoreError> {
        let alerts = self.alerts.read().map_err(|_| AlertStoreError::LockError)?;
        alerts
            .get(id)
            .cloned()
            .ok_or_else(|| AlertStoreError::NotFound(id.to_string()))
    }

    fn list(&self, query: &AlertQuery) -> Result<Vec<Alert>, AlertStoreError> {
        let alerts = self.alerts.read().map_err(|_| AlertStoreError::LockError)?;

        let mut matched: Vec<Alert> = alerts
            .values()
            .filter(|alert| query.matches(alert))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        matched.truncate(query.limit.unwrap_or(usize::MAX));
        Ok(matched)
    }

    fn update_status(&self, id: &str, status: AlertStatus) -> Result<Alert, AlertStoreError> {
        let mut alerts = self.alerts.write().map_err(|_| AlertStoreError::LockError)?;
        let alert = alerts
            .get_mut(id)
            .ok_or_else(|| AlertStoreError::NotFound(id.to_string()))?;
        alert.transition(status);
        Ok(alert.clone())
    }

    fn count(&self) -> Result<usize, AlertStoreError> {
        let alerts = self.alerts.read().map_err(|_| AlertStoreError::LockError)?;
        Ok(alerts.len())
    }
}
