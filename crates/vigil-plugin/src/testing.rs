//! Test doubles for exercising the pipeline without real plugins.
//!
//! These are engine-independent: each double drives its own
//! [`Lifecycle`] and can be started with a detached
//! [`ShutdownToken`](crate::ShutdownToken) outside any engine.
//!
//! | Double | Role | Behavior |
//! |--------|------|----------|
//! | [`ScriptedCollector`] | collector | replays queued batches, then repeats or goes quiet |
//! | [`FlagAnalyzer`] | analyzer | flags every non-empty batch as a low-severity alert |
//! | [`RecordingResponder`] | responder | records every analysis it receives |
//! | [`EchoAgent`] | agent | answers `"ok"` with confidence 0.9 |

use crate::{
    Agent, Analyzer, Collector, Lifecycle, Plugin, PluginParams, PluginRole, PluginStatus,
    Responder, ShutdownToken,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use vigil_types::{
    AgentResponse, Analysis, AnalysisKind, DataPoint, FrameworkError, Severity,
};

const TEST_VERSION: &str = "0.0.0-test";

fn health_of(lifecycle: &Lifecycle, name: &str) -> Result<(), FrameworkError> {
    if lifecycle.status().is_running() {
        Ok(())
    } else {
        Err(FrameworkError::internal(
            "plugin",
            "health",
            format!("{name} is not running"),
        ))
    }
}

/// Collector that replays a queue of scripted results.
///
/// When the queue runs dry it emits the repeat batch if one was
/// configured, otherwise empty batches (which the engine never forwards).
pub struct ScriptedCollector {
    name: String,
    lifecycle: Lifecycle,
    interval: Duration,
    script: Mutex<VecDeque<Result<Vec<DataPoint>, String>>>,
    repeat: Option<Vec<DataPoint>>,
    collect_calls: AtomicUsize,
}

impl ScriptedCollector {
    /// A collector that emits each batch once, in order.
    #[must_use]
    pub fn new(name: impl Into<String>, interval: Duration, batches: Vec<Vec<DataPoint>>) -> Self {
        Self::with_results(name, interval, batches.into_iter().map(Ok).collect())
    }

    /// A collector whose script may include `Err` entries to exercise
    /// collect-failure handling.
    #[must_use]
    pub fn with_results(
        name: impl Into<String>,
        interval: Duration,
        script: Vec<Result<Vec<DataPoint>, String>>,
    ) -> Self {
        Self {
            name: name.into(),
            lifecycle: Lifecycle::new(),
            interval,
            script: Mutex::new(script.into()),
            repeat: None,
            collect_calls: AtomicUsize::new(0),
        }
    }

    /// A collector that emits the same batch on every tick.
    #[must_use]
    pub fn repeating(name: impl Into<String>, interval: Duration, batch: Vec<DataPoint>) -> Self {
        let mut collector = Self::new(name, interval, vec![]);
        collector.repeat = Some(batch);
        collector
    }

    /// Number of `collect` invocations so far.
    #[must_use]
    pub fn collect_calls(&self) -> usize {
        self.collect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for ScriptedCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> PluginRole {
        PluginRole::Collector
    }

    fn version(&self) -> &str {
        TEST_VERSION
    }

    fn configure(&self, _params: &PluginParams) -> Result<(), FrameworkError> {
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
        health_of(&self.lifecycle, &self.name)
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["scripted_batches".into()]
    }
}

#[async_trait]
impl Collector for ScriptedCollector {
    async fn collect(&self) -> Result<Vec<DataPoint>, FrameworkError> {
        self.collect_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(message)) => {
                Err(FrameworkError::internal("collector", "collect", message))
            }
            None => Ok(self.repeat.clone().unwrap_or_default()),
        }
    }

    fn collection_interval(&self) -> Duration {
        self.interval
    }
}

/// Analyzer that turns every non-empty batch into a low-severity alert.
///
/// An optional synchronous delay simulates a slow analyzer.
pub struct FlagAnalyzer {
    name: String,
    lifecycle: Lifecycle,
    delay: Option<Duration>,
    analyze_calls: AtomicUsize,
}

impl FlagAnalyzer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lifecycle: Lifecycle::new(),
            delay: None,
            analyze_calls: AtomicUsize::new(0),
        }
    }

    /// Sleeps synchronously inside every `analyze` call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `analyze` invocations so far.
    #[must_use]
    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for FlagAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> PluginRole {
        PluginRole::Analyzer
    }

    fn version(&self) -> &str {
        TEST_VERSION
    }

    fn configure(&self, _params: &PluginParams) -> Result<(), FrameworkError> {
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
        health_of(&self.lifecycle, &self.name)
    }
}

impl Analyzer for FlagAnalyzer {
    fn can_analyze(&self, batch: &[DataPoint]) -> bool {
        !batch.is_empty()
    }

    fn analyze(&self, batch: &[DataPoint]) -> Result<Option<Analysis>, FrameworkError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Ok(Some(Analysis::new(
            AnalysisKind::Alert,
            1.0,
            Severity::Low,
            format!("flagged {} samples", batch.len()),
            batch.to_vec(),
            &self.name,
        )))
    }
}

/// Responder that records every analysis it is handed.
pub struct RecordingResponder {
    name: String,
    lifecycle: Lifecycle,
    min_severity: Severity,
    recorded: Mutex<Vec<Analysis>>,
}

impl RecordingResponder {
    /// Accepts every analysis.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lifecycle: Lifecycle::new(),
            min_severity: Severity::Low,
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Accepts only analyses at or above the given severity.
    #[must_use]
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn recorded(&self) -> Vec<Analysis> {
        self.recorded.lock().clone()
    }
}

#[async_trait]
impl Plugin for RecordingResponder {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> PluginRole {
        PluginRole::Responder
    }

    fn version(&self) -> &str {
        TEST_VERSION
    }

    fn configure(&self, _params: &PluginParams) -> Result<(), FrameworkError> {
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
        health_of(&self.lifecycle, &self.name)
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    fn can_handle(&self, analysis: &Analysis) -> bool {
        analysis.severity >= self.min_severity
    }

    async fn respond(&self, analysis: &Analysis) -> Result<(), FrameworkError> {
        self.recorded.lock().push(analysis.clone());
        Ok(())
    }
}

/// Agent that answers `"ok"` with confidence 0.9 and stores its context
/// snapshot.
pub struct EchoAgent {
    name: String,
    lifecycle: Lifecycle,
    context: Mutex<Vec<DataPoint>>,
    context_updates: AtomicUsize,
}

impl EchoAgent {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lifecycle: Lifecycle::new(),
            context: Mutex::new(Vec::new()),
            context_updates: AtomicUsize::new(0),
        }
    }

    /// The latest context snapshot.
    #[must_use]
    pub fn context(&self) -> Vec<DataPoint> {
        self.context.lock().clone()
    }

    /// Number of `set_context` calls so far.
    #[must_use]
    pub fn context_updates(&self) -> usize {
        self.context_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for EchoAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> PluginRole {
        PluginRole::Agent
    }

    fn version(&self) -> &str {
        TEST_VERSION
    }

    fn configure(&self, _params: &PluginParams) -> Result<(), FrameworkError> {
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
        health_of(&self.lifecycle, &self.name)
    }
}

#[async_trait]
impl Agent for EchoAgent {
    async fn process_query(&self, query: &str) -> Result<AgentResponse, FrameworkError> {
        Ok(AgentResponse::new(query, "ok", 0.9))
    }

    fn set_context(&self, batch: &[DataPoint]) {
        *self.context.lock() = batch.to_vec();
        self.context_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn available_queries(&self) -> Vec<String> {
        vec!["status".into()]
    }
}
