//! Runtime engine for the Vigil observability framework.
//!
//! This crate hosts everything that runs, as opposed to the contracts in
//! `vigil-plugin` that plugins implement:
//!
//! | Piece | Responsibility |
//! |-------|----------------|
//! | [`PluginRegistry`] | name-unique plugin ownership, role views |
//! | [`PluginFactory`] | subtype kind → constructor table |
//! | [`Engine`] | lifecycle, collector workers, processor, query path |
//! | [`HealthChecker`] | named probes, per-check deadlines, aggregation |
//! | [`FrameworkConfig`] / [`ConfigLoader`] | shape, validation, env overrides |
//! | health surface | axum endpoints `/health` `/ready` `/metrics` `/status` |
//!
//! # A minimal embedding
//!
//! ```no_run
//! use std::sync::Arc;
//! use vigil_plugin::testing::EchoAgent;
//! use vigil_plugin::PluginHandle;
//! use vigil_runtime::{Engine, FrameworkConfig};
//!
//! # #[tokio::main] async fn main() -> Result<(), vigil_types::FrameworkError> {
//! let config = FrameworkConfig {
//!     default_agent: "ai".into(),
//!     ..FrameworkConfig::default()
//! };
//! let engine = Engine::new(config)?;
//! engine.load_plugin(PluginHandle::Agent(Arc::new(EchoAgent::new("ai"))))?;
//!
//! engine.start().await?;
//! let answer = engine.query_default_agent("status?").await?;
//! println!("{}", answer.response);
//! engine.stop().await?;
//! # Ok(()) }
//! ```

mod config;
mod engine;
mod factory;
mod health;
mod http;
mod logging;
mod registry;

pub use config::{ConfigLoader, FrameworkConfig};
pub use engine::{Engine, EngineStatus, FrameworkEvent, MetricsSnapshot, PluginStatusEntry};
pub use factory::{PluginCtor, PluginFactory};
pub use health::{CheckFuture, CheckResult, CheckState, HealthCheck, HealthChecker, HealthStatus};
pub use registry::PluginRegistry;
