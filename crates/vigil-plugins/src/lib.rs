//! Builtin plugins for the Vigil observability runtime.
//!
//! One implementation per role, each registered with the factory under
//! its subtype kind:
//!
//! | Kind | Plugin | Role |
//! |------|--------|------|
//! | `scrape` | [`ScrapeCollector`] | collector |
//! | `statistical` | [`StatisticalAnalyzer`] | analyzer |
//! | `log` | [`LogResponder`] | responder |
//! | `llm` | [`LlmAgent`] | agent |
//!
//! Hosts call [`register_builtin_plugins`] once, then load declared
//! plugins through the engine:
//!
//! ```no_run
//! use vigil_plugins::register_builtin_plugins;
//! use vigil_runtime::{ConfigLoader, Engine};
//!
//! # fn main() -> Result<(), vigil_types::FrameworkError> {
//! let config = ConfigLoader::new().with_path("vigil.toml").load()?;
//! let engine = Engine::new(config)?;
//! register_builtin_plugins(engine.factory());
//!
//! for spec in &engine.config().plugins {
//!     if spec.enabled {
//!         engine.load_plugin_from_config(spec)?;
//!     }
//! }
//! # Ok(()) }
//! ```

mod agents;
mod analyzers;
mod collectors;
mod responders;

pub use agents::LlmAgent;
pub use analyzers::StatisticalAnalyzer;
pub use collectors::ScrapeCollector;
pub use responders::LogResponder;

use std::sync::Arc;
use vigil_plugin::{Plugin, PluginHandle};
use vigil_runtime::PluginFactory;

/// Registers a creator for each builtin subtype kind.
///
/// Each creator constructs the plugin and applies the spec's typed
/// configuration, so a factory-created plugin is ready to start.
pub fn register_builtin_plugins(factory: &PluginFactory) {
    factory.register_creator("scrape", |spec| {
        let plugin = ScrapeCollector::new(&spec.name);
        plugin.configure(&spec.params)?;
        Ok(PluginHandle::Collector(Arc::new(plugin)))
    });
    factory.register_creator("statistical", |spec| {
        let plugin = StatisticalAnalyzer::new(&spec.name);
        plugin.configure(&spec.params)?;
        Ok(PluginHandle::Analyzer(Arc::new(plugin)))
    });
    factory.register_creator("log", |spec| {
        let plugin = LogResponder::new(&spec.name);
        plugin.configure(&spec.params)?;
        Ok(PluginHandle::Responder(Arc::new(plugin)))
    });
    factory.register_creator("llm", |spec| {
        let plugin = LlmAgent::new(&spec.name);
        plugin.configure(&spec.params)?;
        Ok(PluginHandle::Agent(Arc::new(plugin)))
    });
}
