//! Plugin contracts: the base trait and the four role traits.
//!
//! Every plugin implements [`Plugin`]; each role adds its own surface:
//!
//! | Trait | Adds |
//! |-------|------|
//! | [`Collector`] | `collect`, `collection_interval` |
//! | [`Analyzer`] | `can_analyze`, `analyze` |
//! | [`Responder`] | `can_handle`, `respond` |
//! | [`Agent`] | `process_query`, `set_context`, `available_queries` |
//!
//! # Cancellation
//!
//! `start` receives a [`ShutdownToken`] derived from the engine's root
//! signal so a plugin can tie background work to the engine lifetime.
//! The per-call methods (`collect`, `analyze`, `respond`,
//! `process_query`) do not take a token: the engine's workers select
//! against shutdown around those calls, and any outbound I/O inside them
//! is bounded by the plugin's own configured timeouts.
//!
//! # Thread safety
//!
//! Plugins are shared across workers as `Arc<dyn …>`, so every method
//! takes `&self`; implementations keep mutable state behind interior
//! locks (see [`Lifecycle`](crate::Lifecycle) for the status cell).

use crate::{PluginParams, PluginRole, PluginStatus, ShutdownToken};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use vigil_types::{AgentResponse, Analysis, DataPoint, FrameworkError};

/// Base contract implemented by every plugin.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Globally unique plugin name (the registry key).
    fn name(&self) -> &str;

    /// The plugin's role.
    fn role(&self) -> PluginRole;

    /// Plugin version string.
    fn version(&self) -> &str;

    /// Applies a typed configuration record.
    ///
    /// May be called more than once before `start`; only the last value
    /// is observed. A record of the wrong variant is a validation-kind
    /// failure.
    fn configure(&self, params: &PluginParams) -> Result<(), FrameworkError>;

    /// Begins operation.
    ///
    /// Starting an already-running plugin is an internal-kind failure
    /// that leaves the state unchanged. A failed start leaves the plugin
    /// in [`PluginStatus::Error`].
    async fn start(&self, shutdown: ShutdownToken) -> Result<(), FrameworkError>;

    /// Stops operation. Symmetric to `start`: stopping a plugin that is
    /// not running is an internal-kind failure. A plugin in
    /// [`PluginStatus::Error`] may be force-stopped back to `Stopped`.
    async fn stop(&self) -> Result<(), FrameworkError>;

    /// Current lifecycle status.
    fn status(&self) -> PluginStatus;

    /// Probes plugin health. The caller bounds the probe with a deadline;
    /// implementations should keep it cheap.
    async fn health(&self) -> Result<(), FrameworkError>;

    /// Free-form capability tags for discovery.
    fn capabilities(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A plugin that produces telemetry on a periodic schedule.
#[async_trait]
pub trait Collector: Plugin {
    /// Gathers a batch of samples from the source.
    async fn collect(&self) -> Result<Vec<DataPoint>, FrameworkError>;

    /// How often the engine should invoke [`collect`](Self::collect).
    /// A zero duration is replaced by the engine's 30-second default.
    fn collection_interval(&self) -> Duration;
}

/// A plugin that inspects batches and may emit an [`Analysis`].
///
/// `analyze` produces zero or one result per batch; implementations
/// wanting more should fold extra findings into `details` or register
/// multiple analyzers.
pub trait Analyzer: Plugin {
    /// Whether this analyzer can process the given batch.
    fn can_analyze(&self, batch: &[DataPoint]) -> bool;

    /// Processes a batch. `Ok(None)` means "nothing to report".
    fn analyze(&self, batch: &[DataPoint]) -> Result<Option<Analysis>, FrameworkError>;
}

/// A plugin that performs a side effect for an [`Analysis`].
#[async_trait]
pub trait Responder: Plugin {
    /// Whether this responder accepts the given analysis.
    fn can_handle(&self, analysis: &Analysis) -> bool;

    /// Acts on the analysis.
    async fn respond(&self, analysis: &Analysis) -> Result<(), FrameworkError>;
}

/// A plugin that answers free-form textual queries.
#[async_trait]
pub trait Agent: Plugin {
    /// Answers a query, optionally using the latest context snapshot.
    async fn process_query(&self, query: &str) -> Result<AgentResponse, FrameworkError>;

    /// Stores a read-only snapshot of the latest batch. Called by the
    /// processor for every batch; must not block beyond its own copy.
    fn set_context(&self, batch: &[DataPoint]);

    /// Advisory list of prompts this agent handles well.
    fn available_queries(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A registered plugin, viewed through its role.
///
/// The registry stores handles rather than bare `Arc<dyn Plugin>` so the
/// pipeline reaches role-specific methods without runtime downcasts; a
/// handle's variant always agrees with its plugin's role.
#[derive(Clone)]
pub enum PluginHandle {
    Collector(Arc<dyn Collector>),
    Analyzer(Arc<dyn Analyzer>),
    Responder(Arc<dyn Responder>),
    Agent(Arc<dyn Agent>),
}

impl PluginHandle {
    /// The role-agnostic plugin view.
    #[must_use]
    pub fn plugin(&self) -> &dyn Plugin {
        match self {
            Self::Collector(p) => p.as_ref(),
            Self::Analyzer(p) => p.as_ref(),
            Self::Responder(p) => p.as_ref(),
            Self::Agent(p) => p.as_ref(),
        }
    }

    /// Plugin name (registry key).
    #[must_use]
    pub fn name(&self) -> String {
        self.plugin().name().to_string()
    }

    /// The handle's role, derived from its variant.
    #[must_use]
    pub fn role(&self) -> PluginRole {
        match self {
            Self::Collector(_) => PluginRole::Collector,
            Self::Analyzer(_) => PluginRole::Analyzer,
            Self::Responder(_) => PluginRole::Responder,
            Self::Agent(_) => PluginRole::Agent,
        }
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> PluginStatus {
        self.plugin().status()
    }

    /// The collector view, if this handle is one.
    #[must_use]
    pub fn as_collector(&self) -> Option<Arc<dyn Collector>> {
        match self {
            Self::Collector(p) => Some(Arc::clone(p)),
            _ => None,
        }
    }

    /// The analyzer view, if this handle is one.
    #[must_use]
    pub fn as_analyzer(&self) -> Option<Arc<dyn Analyzer>> {
        match self {
            Self::Analyzer(p) => Some(Arc::clone(p)),
            _ => None,
        }
    }

    /// The responder view, if this handle is one.
    #[must_use]
    pub fn as_responder(&self) -> Option<Arc<dyn Responder>> {
        match self {
            Self::Responder(p) => Some(Arc::clone(p)),
            _ => None,
        }
    }

    /// The agent view, if this handle is one.
    #[must_use]
    pub fn as_agent(&self) -> Option<Arc<dyn Agent>> {
        match self {
            Self::Agent(p) => Some(Arc::clone(p)),
            _ => None,
        }
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle")
            .field("name", &self.plugin().name())
            .field("role", &self.role())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoAgent, RecordingResponder, ScriptedCollector};

    #[test]
    fn handle_role_matches_variant() {
        let collector: PluginHandle = PluginHandle::Collector(Arc::new(
            ScriptedCollector::new("c", Duration::from_secs(1), vec![]),
        ));
        assert_eq!(collector.role(), PluginRole::Collector);
        assert_eq!(collector.name(), "c");
        assert!(collector.as_collector().is_some());
        assert!(collector.as_agent().is_none());

        let agent = PluginHandle::Agent(Arc::new(EchoAgent::new("a")));
        assert_eq!(agent.role(), PluginRole::Agent);
        assert!(agent.as_agent().is_some());
        assert!(agent.as_responder().is_none());
    }

    #[test]
    fn handle_exposes_status() {
        let responder = PluginHandle::Responder(Arc::new(RecordingResponder::new("r")));
        assert_eq!(responder.status(), PluginStatus::Stopped);
    }

    #[test]
    fn debug_includes_identity() {
        let handle = PluginHandle::Agent(Arc::new(EchoAgent::new("ai")));
        let text = format!("{handle:?}");
        assert!(text.contains("ai"));
        assert!(text.contains("Agent"));
    }
}
