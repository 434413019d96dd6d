//! Shared engine state, status snapshots, and pipeline counters.

use crate::PluginRegistry;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use vigil_plugin::{PluginRole, PluginStatus};

/// Running/shutdown flags and the start instant, shared between the
/// engine and the health surface.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    running: AtomicBool,
    shutting_down: AtomicBool,
    started_at: RwLock<Option<Instant>>,
}

impl EngineState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Transitions stopped → running. Returns false if already running.
    pub(crate) fn try_begin_running(&self) -> bool {
        let began = self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if began {
            self.shutting_down.store(false, Ordering::SeqCst);
            *self.started_at.write() = Some(Instant::now());
        }
        began
    }

    /// Transitions running → stopped. Returns false if not running.
    pub(crate) fn try_begin_shutdown(&self) -> bool {
        let began = self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if began {
            self.shutting_down.store(true, Ordering::SeqCst);
        }
        began
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Liveness: running and not shutting down.
    pub(crate) fn is_live(&self) -> bool {
        self.is_running() && !self.shutting_down.load(Ordering::SeqCst)
    }

    /// Time since the most recent start, if the engine ever started.
    pub(crate) fn uptime(&self) -> Option<Duration> {
        (*self.started_at.read()).map(|started| started.elapsed())
    }
}

/// One plugin's row in a status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PluginStatusEntry {
    pub role: PluginRole,
    pub status: PluginStatus,
}

/// Point-in-time snapshot of the engine's runtime state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub total_plugins: usize,
    pub collectors: usize,
    pub analyzers: usize,
    pub responders: usize,
    pub agents: usize,
    pub plugins: BTreeMap<String, PluginStatusEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
}

/// Builds a status snapshot from the shared state and the registry.
pub(crate) fn snapshot(state: &EngineState, registry: &PluginRegistry) -> EngineStatus {
    let plugins: BTreeMap<String, PluginStatusEntry> = registry
        .list()
        .into_iter()
        .map(|handle| {
            (
                handle.name(),
                PluginStatusEntry {
                    role: handle.role(),
                    status: handle.status(),
                },
            )
        })
        .collect();

    EngineStatus {
        running: state.is_running(),
        total_plugins: plugins.len(),
        collectors: registry.count_by_role(PluginRole::Collector),
        analyzers: registry.count_by_role(PluginRole::Analyzer),
        responders: registry.count_by_role(PluginRole::Responder),
        agents: registry.count_by_role(PluginRole::Agent),
        plugins,
        uptime_secs: state.uptime().map(|uptime| uptime.as_secs()),
    }
}

/// Counters maintained by the processor worker.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    batches_processed: AtomicU64,
    analyses_produced: AtomicU64,
    analyses_dropped: AtomicU64,
}

impl PipelineMetrics {
    pub(crate) fn record_batch(&self) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_analysis(&self) {
        self.analyses_produced.fetch_add(1, Ordering::Relaxed);
    }

    /// An analysis no responder accepted.
    pub(crate) fn record_dropped(&self) {
        self.analyses_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            analyses_produced: self.analyses_produced.load(Ordering::Relaxed),
            analyses_dropped: self.analyses_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time pipeline counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub batches_processed: u64,
    pub analyses_produced: u64,
    pub analyses_dropped: u64,
}
