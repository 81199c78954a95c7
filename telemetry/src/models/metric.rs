//! Metric sample data model and identity keys.
//!
//! A metric's identity is its name plus its canonical tag set. Tags are kept
//! in a `BTreeMap`, so two samples built from the same pairs in any insertion
//! order compare equal and render the same identity key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical (key-ordered) tag set.
pub type Tags = BTreeMap<String, String>;

/// Type of metric sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// A count or delta (e.g., requests handled).
    Counter,
    /// A point-in-time level (e.g., items in cart).
    Gauge,
    /// An observation destined for a distribution (e.g., order value).
    Histogram,
    /// A measured duration in milliseconds.
    Timer,
    /// A value observed as a set member (e.g., active user ids).
    Set,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter => write!(f, "counter"),
            Self::Gauge => write!(f, "gauge"),
            Self::Histogram => write!(f, "histogram"),
            Self::Timer => write!(f, "timer"),
            Self::Set => write!(f, "set"),
        }
    }
}

/// A single metric sample.
///
/// # Example
///
/// ```
/// use telemetry::models::{Metric, MetricType};
///
/// let metric = Metric::new("orders.placed", MetricType::Counter, 1.0)
///     .with_tag("tenant", "acme")
///     .with_tag("channel", "web");
///
/// assert_eq!(metric.identity_key(), "orders.placed{channel=web,tenant=acme}");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// The metric name (e.g., "`http.requests`").
    pub name: String,

    /// The type of sample.
    pub metric_type: MetricType,

    /// The sampled value.
    pub value: f64,

    /// Canonical tag set.
    #[serde(default)]
    pub tags: Tags,

    /// Timestamp when the sample was recorded.
    pub timestamp: DateTime<Utc>,

    /// Name of the recording service.
    #[serde(default)]
    pub service: String,

    /// Version of the recording service.
    #[serde(default)]
    pub version: String,
}

impl Metric {
    /// Creates a new sample with the current timestamp.
    #[must_use]
    pub fn new(name: impl Into<String>, metric_type: MetricType, value: f64) -> Self {
        Self {
            name: name.into(),
            metric_type,
            value,
            tags: Tags::new(),
            timestamp: Utc::now(),
            service: String::new(),
            version: String::new(),
        }
    }

    /// Adds a tag to the sample.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Sets the recording service name and version.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>, version: impl Into<String>) -> Self {
        self.service = service.into();
        self.version = version.into();
        self
    }

    /// Returns the identity key this sample is stored under.
    #[must_use]
    pub fn identity_key(&self) -> String {
        identity_key(&self.name, &self.tags)
    }
}

/// The identity of a stored metric: name plus canonical tag set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricIdentity {
    /// Metric name.
    pub name: String,
    /// Canonical tag set.
    pub tags: Tags,
}

impl MetricIdentity {
    /// Builds an identity from a name and tag pairs in any order.
    ///
    /// When a key repeats, the last pair wins.
    pub fn new<I, K, V>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            tags: canonical_tags(tags),
        }
    }

    /// Renders the identity key string.
    #[must_use]
    pub fn key(&self) -> String {
        identity_key(&self.name, &self.tags)
    }
}

impl fmt::Display for MetricIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Collects tag pairs into a canonical tag set.
pub fn canonical_tags<I, K, V>(tags: I) -> Tags
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    tags.into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Merges collector default tags with call-site tags; call-site values win.
#[must_use]
pub fn merge_tags(defaults: &Tags, call_site: Tags) -> Tags {
    if defaults.is_empty() {
        return call_site;
    }
    let mut merged = defaults.clone();
    merged.extend(call_site);
    merged
}

/// Renders the identity key for a name and canonical tag set.
///
/// The format is `name{k1=v1,k2=v2}` with tags in key order, or just `name`
/// when untagged. Separator characters inside names, keys and values are
/// backslash-escaped so distinct identities never render the same key.
#[must_use]
pub fn identity_key(name: &str, tags: &Tags) -> String {
    let mut key = String::with_capacity(name.len() + tags.len() * 16);
    push_escaped(&mut key, name);
    if tags.is_empty() {
        return key;
    }

    key.push('{');
    for (i, (k, v)) in tags.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        push_escaped(&mut key, k);
        key.push('=');
        push_escaped(&mut key, v);
    }
    key.push('}');
    key
}

fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        if matches!(c, '\\' | ',' | '=' | '{' | '}') {
            out.push('\\');
        }
        out.push(c);
    }
}
