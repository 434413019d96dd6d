//! Analysis results produced by analyzer plugins.

use crate::DataPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// What an analyzer concluded about a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// A sample deviates significantly from the rest of the window.
    Anomaly,
    /// A sustained directional change.
    Trend,
    /// Related movement across metrics.
    Correlation,
    /// A condition crossed an explicit alerting rule.
    Alert,
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Anomaly => "anomaly",
            Self::Trend => "trend",
            Self::Correlation => "correlation",
            Self::Alert => "alert",
        };
        f.write_str(name)
    }
}

/// Severity of an analysis result, ordered from least to most severe.
///
/// The ordering makes severity floors a plain comparison:
///
/// ```
/// use vigil_types::Severity;
///
/// assert!(Severity::High >= Severity::Medium);
/// assert!(Severity::Low < Severity::Critical);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!(
                "unknown severity: '{other}' (expected: low, medium, high, critical)"
            )),
        }
    }
}

/// Result of analyzing a batch of [`DataPoint`]s.
///
/// Produced by analyzers, consumed by responders. A well-formed analysis
/// has a non-empty `data_points` list and a finite confidence in `[0, 1]`;
/// the processor refuses to surface anything else to responders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// What kind of conclusion this is.
    pub kind: AnalysisKind,
    /// Confidence in the conclusion, `0.0` to `1.0`.
    pub confidence: f64,
    /// How severe the finding is.
    pub severity: Severity,
    /// One-line human-readable summary.
    pub summary: String,
    /// Analyzer-specific detail values.
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
    /// The samples that produced this conclusion.
    pub data_points: Vec<DataPoint>,
    /// When the analysis was produced.
    pub timestamp: DateTime<Utc>,
    /// Name of the producing analyzer.
    pub source: String,
}

impl Analysis {
    /// Creates an analysis timestamped now with empty details.
    #[must_use]
    pub fn new(
        kind: AnalysisKind,
        confidence: f64,
        severity: Severity,
        summary: impl Into<String>,
        data_points: Vec<DataPoint>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            confidence,
            severity,
            summary: summary.into(),
            details: HashMap::new(),
            data_points,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    /// Adds a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Whether this analysis may be surfaced to responders: non-empty
    /// data points and a finite confidence in `[0, 1]`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.data_points.is_empty()
            && self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
    }
}
