//! Alert data model.
//!
//! Alerts are stored and served by collaborators; the core only defines the
//! record and its status transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Info,
    /// Needs attention soon.
    #[default]
    Warning,
    /// Needs attention now.
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Alert lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// The alert is firing.
    #[default]
    Active,
    /// The condition cleared.
    Resolved,
    /// Notifications are suppressed.
    Muted,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Resolved => write!(f, "resolved"),
            Self::Muted => write!(f, "muted"),
        }
    }
}

/// An operator-facing alert.
///
/// # Example
///
/// ```
/// use telemetry::models::{Alert, AlertSeverity, AlertStatus};
///
/// let mut alert = Alert::new(
///     "Checkout latency high",
///     "checkout",
///     "checkout.duration p95 > 800ms",
/// )
/// .with_severity(AlertSeverity::Critical);
///
/// alert.resolve();
/// assert_eq!(alert.status, AlertStatus::Resolved);
/// assert!(alert.validate_alert().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Alert {
    /// Unique alert id.
    pub id: String,

    /// Short title.
    #[validate(length(min = 1, message = "Alert title cannot be empty"))]
    pub title: String,

    /// Longer description.
    #[serde(default)]
    pub description: String,

    /// Severity.
    #[serde(default)]
    pub severity: AlertSeverity,

    /// Originating service.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,

    /// Free-text condition that raised the alert.
    #[validate(length(min = 1, message = "Condition cannot be empty"))]
    pub condition: String,

    /// Lifecycle status.
    #[serde(default)]
    pub status: AlertStatus,

    /// When the alert was raised.
    pub created_at: DateTime<Utc>,

    /// When the alert last changed.
    pub updated_at: DateTime<Utc>,

    /// When the alert was resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Errors that can occur during alert validation.
#[derive(Debug, Error)]
pub enum AlertValidationError {
    /// The title is empty.
    #[error("Alert title cannot be empty")]
    EmptyTitle,

    /// The service name is empty.
    #[error("Service name cannot be empty")]
    EmptyService,

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl Alert {
    /// Creates an active alert with a fresh id.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        service: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            title: title.into(),
            description: String::new(),
            severity: AlertSeverity::default(),
            service: service.into(),
            condition: condition.into(),
            status: AlertStatus::Active,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Marks the alert resolved.
    pub fn resolve(&mut self) {
        let now = Utc::now();
        self.status = AlertStatus::Resolved;
        self.resolved_at = Some(now);
        self.updated_at = now;
    }

    /// Mutes the alert.
    pub fn mute(&mut self) {
        self.status = AlertStatus::Muted;
        self.updated_at = Utc::now();
    }

    /// Puts the alert back into the active state.
    pub fn reactivate(&mut self) {
        self.status = AlertStatus::Active;
        self.resolved_at = None;
        self.updated_at = Utc::now();
    }

    /// Applies a status transition by target status.
    pub fn transition(&mut self, status: AlertStatus) {
        match status {
            AlertStatus::Active => self.reactivate(),
            AlertStatus::Resolved => self.resolve(),
            AlertStatus::Muted => self.mute(),
        }
    }

    /// Validates the alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the title, service or condition is empty.
    pub fn validate_alert(&self) -> Result<(), AlertValidationError> {
        if self.title.is_empty() {
            return Err(AlertValidationError::EmptyTitle);
        }
        if self.service.is_empty() {
            return Err(AlertValidationError::EmptyService);
        }
        self.validate()?;
        Ok(())
    }
}
