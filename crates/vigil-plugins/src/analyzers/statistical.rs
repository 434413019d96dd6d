//! Statistical anomaly detection over a trailing window.

use parking_lot::RwLock;
use vigil_plugin::{
    Analyzer, Lifecycle, Plugin, PluginParams, PluginRole, PluginStatus, ShutdownToken,
    StatisticalConfig,
};
use vigil_types::{Analysis, AnalysisKind, DataPoint, FrameworkError, Severity};
use async_trait::async_trait;

/// Flags samples deviating from the batch mean by more than
/// `threshold` standard deviations.
///
/// Only the trailing `window_size` samples of a batch are considered.
/// Confidence is the largest observed deviation relative to the
/// threshold, capped at 1.0, and maps onto severity:
///
/// | Confidence | Severity |
/// |------------|----------|
/// | ≥ 0.9 | critical |
/// | ≥ 0.7 | high |
/// | ≥ 0.5 | medium |
/// | otherwise | low |
pub struct StatisticalAnalyzer {
    name: String,
    lifecycle: Lifecycle,
    config: RwLock<StatisticalConfig>,
}

impl StatisticalAnalyzer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lifecycle: Lifecycle::new(),
            config: RwLock::new(StatisticalConfig::default()),
        }
    }
}

fn mean_and_std_dev(points: &[DataPoint]) -> (f64, f64) {
    let n = points.len() as f64;
    let mean = points.iter().map(|p| p.value).sum::<f64>() / n;
    let variance = points
        .iter()
        .map(|p| {
            let diff = p.value - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

fn severity_for(confidence: f64) -> Severity {
    if confidence >= 0.9 {
        Severity::Critical
    } else if confidence >= 0.7 {
        Severity::High
    } else if confidence >= 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[async_trait]
impl Plugin for StatisticalAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> PluginRole {
        PluginRole::Analyzer
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn configure(&self, params: &PluginParams) -> Result<(), FrameworkError> {
        let PluginParams::Statistical(config) = params else {
            return Err(FrameworkError::validation(
                "analyzer",
                "configure",
                format!("{}: expected statistical configuration", self.name),
            ));
        };
        params.validate(&self.name)?;
        *self.config.write() = config.clone();
        Ok(())
    }

    async fn start(&self, _shutdown: ShutdownToken) -> Result<(), FrameworkError> {
        self.lifecycle.begin_start(&self.name)?;
        self.lifecycle.complete_start();
        Ok(())
    }

    async fn stop(&self) -> Result<(), FrameworkError> {
        self.lifecycle.begin_stop(&self.name)?;
        self.lifecycle.complete_stop();
        Ok(())
    }

    fn status(&self) -> PluginStatus {
        self.lifecycle.status()
    }

    async fn health(&self) -> Result<(), FrameworkError> {
        if self.status().is_running() {
            Ok(())
        } else {
            Err(FrameworkError::internal(
                "analyzer",
                "health",
                format!("{} is not running", self.name),
            ))
        }
    }

    fn capabilities(&self) -> Vec<String> {
        vec![
            "anomaly_detection".into(),
            "statistical_analysis".into(),
            "threshold_detection".into(),
        ]
    }
}

impl Analyzer for StatisticalAnalyzer {
    fn can_analyze(&self, batch: &[DataPoint]) -> bool {
        // A deviation needs at least two samples to be meaningful.
        batch.len() >= 2
    }

    fn analyze(&self, batch: &[DataPoint]) -> Result<Option<Analysis>, FrameworkError> {
        let config = self.config.read().clone();

        let window_start = batch.len().saturating_sub(config.window_size);
        let window = &batch[window_start..];
        if window.len() < 2 {
            return Ok(None);
        }

        let (mean, std_dev) = mean_and_std_dev(window);
        if std_dev <= f64::EPSILON {
            return Ok(None);
        }

        let anomalies: Vec<DataPoint> = window
            .iter()
            .filter(|p| (p.value - mean).abs() > config.threshold * std_dev)
            .cloned()
            .collect();
        if anomalies.is_empty() {
            return Ok(None);
        }

        let max_deviation = anomalies
            .iter()
            .map(|p| (p.value - mean).abs() / std_dev)
            .fold(0.0_f64, f64::max);
        let confidence = (max_deviation / config.threshold).min(1.0);
        let severity = severity_for(confidence);

        Ok(Some(
            Analysis::new(
                AnalysisKind::Anomaly,
                confidence,
                severity,
                format!(
                    "detected {} anomalies with max deviation of {max_deviation:.2} sigma",
                    anomalies.len()
                ),
                anomalies,
                &self.name,
            )
            .with_detail("mean", serde_json::json!(mean))
            .with_detail("std_dev", serde_json::json!(std_dev))
            .with_detail("threshold", serde_json::json!(config.threshold)),
        ))
    }
}
