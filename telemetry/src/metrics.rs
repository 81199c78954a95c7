//! Thread-safe, identity-keyed metric sample store.
//!
//! Every recording call computes the sample's identity (name plus the merged,
//! canonical tag set) and stores the sample under that identity's key.
//!
//! # Semantics
//!
//! The collector is a **latest-value cache**: a new sample replaces whatever
//! was stored at the same identity. This holds for counters too, so
//! `increment` records a `+1` sample rather than bumping a running total.
//! Aggregation over time is left to whoever consumes `get_metrics()`
//! snapshots.
//!
//! # Limitations
//!
//! Storage is unbounded: one entry per distinct identity is kept for the life
//! of the collector. `reset` is the only way to release it.

use crate::models::{canonical_tags, identity_key, merge_tags, Metric, MetricType, Tags};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Tag added to business metrics.
pub const BUSINESS_CATEGORY_TAG: &str = "category";

/// Collects metric samples keyed by identity.
///
/// One reader/writer lock guards the whole store. Mutations hold the write
/// lock for key computation and the map write; snapshots hold the read lock
/// while copying.
///
/// # Example
///
/// ```
/// use telemetry::MetricsCollector;
///
/// let metrics = MetricsCollector::new("cart", "1.0.0");
/// metrics.counter("cart.items_added", 3.0, [("tenant", "acme"), ("channel", "web")]);
/// metrics.counter("cart.items_added", 1.0, [("channel", "web"), ("tenant", "acme")]);
///
/// let snapshot = metrics.get_metrics();
/// assert_eq!(snapshot.len(), 1);
/// assert_eq!(snapshot["cart.items_added{channel=web,tenant=acme}"].value, 1.0);
/// ```
#[derive(Debug, Default)]
pub struct MetricsCollector {
    service: String,
    version: String,
    default_tags: Tags,
    metrics: RwLock<HashMap<String, Metric>>,
}

impl MetricsCollector {
    /// Creates an empty collector without default tags.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self::with_default_tags(service, version, Tags::new())
    }

    /// Creates an empty collector whose samples all carry `default_tags`
    /// unless a call-site tag overrides them.
    #[must_use]
    pub fn with_default_tags(
        service: impl Into<String>,
        version: impl Into<String>,
        default_tags: Tags,
    ) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            default_tags,
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// The collector-level default tags.
    #[must_use]
    pub fn default_tags(&self) -> &Tags {
        &self.default_tags
    }

    /// Records a counter sample.
    pub fn counter<I, K, V>(&self, name: &str, value: f64, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.record(name, MetricType::Counter, value, tags);
    }

    /// Records a gauge sample.
    pub fn gauge<I, K, V>(&self, name: &str, value: f64, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.record(name, MetricType::Gauge, value, tags);
    }

    /// Records a histogram observation.
    pub fn histogram<I, K, V>(&self, name: &str, value: f64, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.record(name, MetricType::Histogram, value, tags);
    }

    /// Records a timer sample in milliseconds.
    pub fn timer<I, K, V>(&self, name: &str, value_ms: f64, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.record(name, MetricType::Timer, value_ms, tags);
    }

    /// Records a set sample.
    pub fn set<I, K, V>(&self, name: &str, value: f64, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.record(name, MetricType::Set, value, tags);
    }

    /// Records a `+1` counter sample.
    pub fn increment<I, K, V>(&self, name: &str, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.counter(name, 1.0, tags);
    }

    /// Records a `-1` counter sample.
    pub fn decrement<I, K, V>(&self, name: &str, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.counter(name, -1.0, tags);
    }

    /// Records an already-measured duration as a timer.
    pub fn record_duration<I, K, V>(&self, name: &str, duration: Duration, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.timer(name, duration_ms(duration), tags);
    }

    /// Runs `f`, records its wall-clock duration as a timer, and returns its
    /// result.
    pub fn timing<I, K, V, F, T>(&self, name: &str, tags: I, f: F) -> T
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let result = f();
        self.record_duration(name, start.elapsed(), tags);
        result
    }

    /// Awaits `future`, records the elapsed wall-clock time as a timer, and
    /// returns its output.
    pub async fn timing_async<I, K, V, Fut>(&self, name: &str, tags: I, future: Fut) -> Fut::Output
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
        Fut: Future,
    {
        let start = Instant::now();
        let output = future.await;
        self.record_duration(name, start.elapsed(), tags);
        output
    }

    /// Records a business KPI (e.g., order value) as gauge `business.<name>`
    /// tagged `category=business`.
    pub fn record_business_metric<I, K, V>(&self, name: &str, value: f64, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut tags = canonical_tags(tags);
        tags.insert(BUSINESS_CATEGORY_TAG.to_string(), "business".to_string());
        self.gauge(&format!("business.{name}"), value, tags);
    }

    /// Records the duration of a named operation as timer
    /// `performance.<operation>` tagged `operation=<operation>`.
    pub fn record_performance_metric<I, K, V>(&self, operation: &str, duration: Duration, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut tags = canonical_tags(tags);
        tags.insert("operation".to_string(), operation.to_string());
        self.record_duration(&format!("performance.{operation}"), duration, tags);
    }

    /// Returns a copy of the whole store keyed by identity key.
    #[must_use]
    pub fn get_metrics(&self) -> HashMap<String, Metric> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns a copy of the sample stored for `name` and `tags` (merged with
    /// the default tags), if any.
    pub fn get<I, K, V>(&self, name: &str, tags: I) -> Option<Metric>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let key = identity_key(name, &merge_tags(&self.default_tags, canonical_tags(tags)));
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Number of stored identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears the store.
    pub fn reset(&self) {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record<I, K, V>(&self, name: &str, metric_type: MetricType, value: f64, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let call_site = canonical_tags(tags);

        // A poisoned lock only means another writer panicked; the map is
        // never left half-written, so recover and keep recording.
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        let tags = merge_tags(&self.default_tags, call_site);
        let key = identity_key(name, &tags);
        let mut metric =
            Metric::new(name, metric_type, value).with_service(&self.service, &self.version);
        metric.tags = tags;
        metrics.insert(key, metric);
    }
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
