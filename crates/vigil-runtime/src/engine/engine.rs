//! The pipeline engine: plugin lifecycle, workers, and the query path.
//!
//! # Runtime shape
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                           Engine                              │
//! │  ┌──────────┐   ┌─────────┐   ┌───────────────┐               │
//! │  │ Registry │   │ Factory │   │ HealthChecker │               │
//! │  └──────────┘   └─────────┘   └───────────────┘               │
//! │                                                               │
//! │  collector worker ─┐                                          │
//! │  collector worker ─┼──► bounded channel ──► processor ──► …   │
//! │  collector worker ─┘                                          │
//! │                                                               │
//! │  HTTP health surface (axum)                                   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Start order
//!
//! Responders and agents must be ready before collectors begin pushing
//! batches, so plugins start responders → analyzers → agents →
//! collectors. A plugin failing to start is logged and left in `error`
//! status; the engine keeps running and the operator sees the failure in
//! [`Engine::status`] and the logs.
//!
//! # Shutdown
//!
//! [`Engine::stop`] fires the root shutdown signal, waits up to the
//! configured `shutdown_timeout` for workers to drain, then stops every
//! plugin best-effort. Producers blocked on a full channel observe the
//! signal mid-send, drop their batch, and exit.

use super::event::FrameworkEvent;
use super::state::{snapshot, EngineState, EngineStatus, MetricsSnapshot, PipelineMetrics};
use super::worker;
use crate::http::{self, HttpState};
use crate::{logging, FrameworkConfig, HealthChecker, HealthStatus, PluginFactory, PluginRegistry};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vigil_plugin::{
    Agent, Plugin, PluginHandle, PluginRole, PluginSpec, PluginStatus, ShutdownHandle,
};
use vigil_types::{AgentResponse, DataPoint, FrameworkError};

/// Live resources owned by a running engine.
#[derive(Default)]
struct EngineInner {
    workers: Vec<JoinHandle<()>>,
    shutdown: Option<ShutdownHandle>,
    data_tx: Option<mpsc::Sender<Vec<DataPoint>>>,
}

/// The orchestrator holding the registry, the factory, the channel, and
/// the workers.
pub struct Engine {
    config: FrameworkConfig,
    registry: Arc<PluginRegistry>,
    factory: PluginFactory,
    health: Arc<HealthChecker>,
    metrics: Arc<PipelineMetrics>,
    events: broadcast::Sender<FrameworkEvent>,
    state: Arc<EngineState>,
    inner: Mutex<EngineInner>,
}

impl Engine {
    /// Creates an engine from a validated configuration.
    ///
    /// Initializes the process-wide structured logger (once per process)
    /// and registers the default health checks (`engine_running`,
    /// `plugins_healthy`).
    pub fn new(config: FrameworkConfig) -> Result<Self, FrameworkError> {
        config.validate()?;
        logging::init(&config);

        let registry = Arc::new(PluginRegistry::new());
        let state = Arc::new(EngineState::new());
        let health = Arc::new(HealthChecker::new(Duration::from_secs(
            config.health_check_timeout,
        )));
        let (events, _) = broadcast::channel(64);

        {
            let state = Arc::clone(&state);
            health.register_check("engine_running", move || {
                let state = Arc::clone(&state);
                Box::pin(async move {
                    if state.is_running() {
                        Ok(())
                    } else {
                        Err(FrameworkError::internal(
                            "health",
                            "check",
                            "engine is not running",
                        ))
                    }
                })
            });
        }
        {
            let registry = Arc::clone(&registry);
            health.register_check("plugins_healthy", move || {
                let registry = Arc::clone(&registry);
                Box::pin(async move {
                    let mut broken: Vec<String> = registry
                        .list()
                        .into_iter()
                        .filter(|handle| handle.status() == PluginStatus::Error)
                        .map(|handle| handle.name())
                        .collect();
                    if broken.is_empty() {
                        Ok(())
                    } else {
                        broken.sort();
                        Err(FrameworkError::internal(
                            "health",
                            "check",
                            format!("plugins in error state: {}", broken.join(", ")),
                        ))
                    }
                })
            });
        }

        Ok(Self {
            config,
            registry,
            factory: PluginFactory::new(),
            health: Arc::clone(&health),
            metrics: Arc::new(PipelineMetrics::default()),
            events,
            state,
            inner: Mutex::new(EngineInner::default()),
        })
    }

    /// The plugin registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The plugin factory.
    #[must_use]
    pub fn factory(&self) -> &PluginFactory {
        &self.factory
    }

    /// The health checker, for registering custom checks.
    #[must_use]
    pub fn health_checker(&self) -> &Arc<HealthChecker> {
        &self.health
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Subscribes to framework lifecycle events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<FrameworkEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: FrameworkEvent) {
        // Best-effort: send fails only when nobody is subscribed.
        let _ = self.events.send(event);
    }

    /// Registers a plugin. Never starts it.
    pub fn load_plugin(&self, handle: PluginHandle) -> Result<(), FrameworkError> {
        let plugin = handle.name();
        let role = handle.role();
        self.registry.register(handle)?;
        self.emit(FrameworkEvent::PluginLoaded {
            plugin: plugin.clone(),
            role,
        });
        info!(%plugin, %role, "plugin loaded");
        Ok(())
    }

    /// Constructs a plugin via the factory, then registers it.
    pub fn load_plugin_from_config(&self, spec: &PluginSpec) -> Result<(), FrameworkError> {
        let handle = self.factory.create(spec)?;
        self.load_plugin(handle)
    }

    /// Stops (best-effort) and unregisters a plugin.
    pub async fn unload_plugin(&self, name: &str) -> Result<(), FrameworkError> {
        let handle = self.registry.get(name)?;
        if handle.status().is_running() {
            if let Err(e) = handle.plugin().stop().await {
                error!(plugin = name, error = %e, "failed to stop plugin during unload");
            }
        }
        let removed = self.registry.unregister(name)?;
        self.emit(FrameworkEvent::PluginUnloaded {
            plugin: removed.name(),
            role: removed.role(),
        });
        info!(plugin = name, "plugin unloaded");
        Ok(())
    }

    /// Starts the engine: plugins (in role order), collector workers, the
    /// processor, and the health surface.
    ///
    /// Returns ok even if individual plugins failed to start; their
    /// errors are logged and their status reflects the failure. Starting
    /// an already-running engine is an internal-kind failure.
    pub async fn start(&self) -> Result<(), FrameworkError> {
        if !self.state.try_begin_running() {
            return Err(FrameworkError::internal(
                "engine",
                "start",
                "engine is already running",
            ));
        }
        info!("starting engine");

        let shutdown = ShutdownHandle::new();
        let (data_tx, data_rx) = mpsc::channel(self.config.data_channel_size);

        // Consumers first: responders and agents must be ready before
        // collectors push their first batch.
        const START_ORDER: [PluginRole; 4] = [
            PluginRole::Responder,
            PluginRole::Analyzer,
            PluginRole::Agent,
            PluginRole::Collector,
        ];
        for role in START_ORDER {
            for handle in self.registry.list_by_role(role) {
                if let Err(e) = handle.plugin().start(shutdown.token()).await {
                    error!(plugin = %handle.name(), error = %e, "failed to start plugin");
                }
            }
        }

        let mut workers = Vec::new();
        for collector in self.registry.collectors() {
            workers.push(tokio::spawn(worker::collector_worker(
                collector,
                data_tx.clone(),
                shutdown.token(),
            )));
        }
        workers.push(tokio::spawn(worker::processor(
            Arc::clone(&self.registry),
            data_rx,
            shutdown.token(),
            Arc::clone(&self.metrics),
        )));

        let addr = format!("{}:{}", self.config.server_host, self.config.server_port);
        workers.push(tokio::spawn(http::serve(
            addr,
            HttpState::new(
                Arc::clone(&self.state),
                Arc::clone(&self.registry),
                Arc::clone(&self.metrics),
            ),
            shutdown.token(),
        )));

        {
            let mut inner = self.inner.lock();
            inner.workers = workers;
            inner.shutdown = Some(shutdown);
            inner.data_tx = Some(data_tx);
        }

        let plugin_count = self.registry.count();
        self.emit(FrameworkEvent::FrameworkStarted { plugin_count });
        info!(plugin_count, "engine started");
        Ok(())
    }

    /// Stops the engine: fires the shutdown signal, waits for workers up
    /// to `shutdown_timeout`, then stops every plugin best-effort.
    ///
    /// Stopping an engine that is not running is an internal-kind
    /// failure.
    pub async fn stop(&self) -> Result<(), FrameworkError> {
        if !self.state.try_begin_shutdown() {
            return Err(FrameworkError::internal(
                "engine",
                "stop",
                "engine is not running",
            ));
        }
        info!("stopping engine");

        let (workers, shutdown, data_tx) = {
            let mut inner = self.inner.lock();
            (
                std::mem::take(&mut inner.workers),
                inner.shutdown.take(),
                inner.data_tx.take(),
            )
        };

        if let Some(shutdown) = &shutdown {
            shutdown.shutdown();
        }
        // Dropping the engine's sender lets the processor observe channel
        // closure once the collector workers exit.
        drop(data_tx);

        let drain = async {
            for worker in workers {
                if let Err(e) = worker.await {
                    if e.is_panic() {
                        error!(error = %e, "worker panicked");
                    }
                }
            }
        };
        let timeout = Duration::from_secs(self.config.shutdown_timeout);
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                timeout_secs = self.config.shutdown_timeout,
                "timed out waiting for workers to stop"
            );
        }

        for handle in self.registry.list() {
            if handle.status() == PluginStatus::Stopped {
                continue;
            }
            if let Err(e) = handle.plugin().stop().await {
                error!(plugin = %handle.name(), error = %e, "failed to stop plugin");
            }
        }

        let uptime_secs = self.state.uptime().map_or(0, |uptime| uptime.as_secs());
        self.emit(FrameworkEvent::FrameworkStopped { uptime_secs });
        info!("engine stopped");
        Ok(())
    }

    /// Routes a query to the named agent.
    pub async fn query_agent(
        &self,
        name: &str,
        query: &str,
    ) -> Result<AgentResponse, FrameworkError> {
        let handle = self.registry.get(name).map_err(|_| {
            FrameworkError::plugin("engine", "query", format!("agent {name} not found"))
        })?;
        match handle.as_agent() {
            Some(agent) => agent.process_query(query).await,
            None => Err(FrameworkError::plugin(
                "engine",
                "query",
                format!("plugin {name} is not an agent"),
            )),
        }
    }

    /// Routes a query to the configured default agent.
    pub async fn query_default_agent(
        &self,
        query: &str,
    ) -> Result<AgentResponse, FrameworkError> {
        if self.config.default_agent.is_empty() {
            return Err(FrameworkError::configuration(
                "engine",
                "query",
                "no default agent configured",
            ));
        }
        self.query_agent(&self.config.default_agent, query).await
    }

    /// Point-in-time snapshot of the engine's runtime state.
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        snapshot(&self.state, &self.registry)
    }

    /// Runs all registered health checks and aggregates the results.
    pub async fn health(&self) -> HealthStatus {
        self.health.check_all().await
    }

    /// Point-in-time pipeline counter values.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
