//! Telemetry samples flowing through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single telemetry sample from an observability source.
///
/// Created by collectors and immutable once emitted; a `DataPoint` lives
/// only while flowing through the pipeline (no persistence).
///
/// # Example
///
/// ```
/// use vigil_types::DataPoint;
///
/// let point = DataPoint::new("node-exporter", "cpu_usage_percent", 42.5)
///     .with_label("host", "web-1");
///
/// assert_eq!(point.metric, "cpu_usage_percent");
/// assert_eq!(point.labels.get("host").map(String::as_str), Some("web-1"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// When the sample was taken.
    pub timestamp: DateTime<Utc>,
    /// Name of the producing source (usually the collector plugin).
    pub source: String,
    /// Metric name.
    pub metric: String,
    /// Sampled value.
    pub value: f64,
    /// Dimension labels.
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Open metadata, for collector-specific annotations.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl DataPoint {
    /// Creates a sample timestamped now, with empty labels and metadata.
    #[must_use]
    pub fn new(source: impl Into<String>, metric: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            metric: metric.into(),
            value,
            labels: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// Adds a dimension label.
    #[must_use]
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
