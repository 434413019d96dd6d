//! Responder that records analyses through the process logger.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};
use vigil_plugin::{
    Lifecycle, LogSinkConfig, Plugin, PluginParams, PluginRole, PluginStatus, Responder,
    ShutdownToken,
};
use vigil_types::{Analysis, FrameworkError, Severity};

/// Writes one structured log entry per accepted analysis.
///
/// Analyses below the configured severity floor are refused in
/// `can_handle`. Severity maps onto log level: critical → error,
/// high → warn, medium → info, low → debug. Formatting and routing of
/// the entries follow the process-wide logger configuration.
pub struct LogResponder {
    name: String,
    lifecycle: Lifecycle,
    config: RwLock<LogSinkConfig>,
}

impl LogResponder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lifecycle: Lifecycle::new(),
            config: RwLock::new(LogSinkConfig::default()),
        }
    }
}

#[async_trait]
impl Plugin for LogResponder {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> PluginRole {
        PluginRole::Responder
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn configure(&self, params: &PluginParams) -> Result<(), FrameworkError> {
        let PluginParams::Log(config) = params else {
            return Err(FrameworkError::validation(
                "responder",
                "configure",
                format!("{}: expected log configuration", self.name),
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
                "responder",
                "health",
                format!("{} is not running", self.name),
            ))
        }
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["log_analysis".into(), "severity_filtering".into()]
    }
}

#[async_trait]
impl Responder for LogResponder {
    fn can_handle(&self, analysis: &Analysis) -> bool {
        analysis.severity >= self.config.read().min_severity
    }

    async fn respond(&self, analysis: &Analysis) -> Result<(), FrameworkError> {
        let message = format!("[{}] {}", analysis.kind, analysis.summary);
        let responder = self.name.as_str();
        let analyzer = analysis.source.as_str();
        let data_points = analysis.data_points.len();

        match analysis.severity {
            Severity::Critical => error!(
                responder,
                analyzer,
                confidence = analysis.confidence,
                severity = %analysis.severity,
                data_points,
                "{message}"
            ),
            Severity::High => warn!(
                responder,
                analyzer,
                confidence = analysis.confidence,
                severity = %analysis.severity,
                data_points,
                "{message}"
            ),
            Severity::Medium => info!(
                responder,
                analyzer,
                confidence = analysis.confidence,
                severity = %analysis.severity,
                data_points,
                "{message}"
            ),
            Severity::Low => debug!(
                responder,
                analyzer,
                confidence = analysis.confidence,
                severity = %analysis.severity,
                data_points,
                "{message}"
            ),
        }
        Ok(())
    }
}
