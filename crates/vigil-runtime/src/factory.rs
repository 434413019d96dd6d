//! Plugin factory: maps subtype kinds to constructor functions.
//!
//! The factory holds a table from subtype key (the `type` tag of a
//! [`PluginSpec`]) to a [`PluginCtor`]. It constructs plugins but never
//! registers them — wiring into the registry is performed by the engine
//! at load time.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vigil_plugin::testing::ScriptedCollector;
//! use vigil_plugin::{PluginHandle, PluginParams, PluginSpec, ScrapeConfig};
//! use vigil_runtime::PluginFactory;
//!
//! let factory = PluginFactory::new();
//! factory.register_creator("scrape", |spec| {
//!     Ok(PluginHandle::Collector(Arc::new(ScriptedCollector::new(
//!         &spec.name,
//!         Duration::from_secs(1),
//!         vec![],
//!     ))))
//! });
//!
//! let spec = PluginSpec {
//!     name: "cpu".into(),
//!     enabled: true,
//!     params: PluginParams::Scrape(ScrapeConfig::default()),
//! };
//! let handle = factory.create(&spec).unwrap();
//! assert_eq!(handle.name(), "cpu");
//! ```

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use vigil_plugin::{PluginHandle, PluginSpec};
use vigil_types::FrameworkError;

/// Constructor for one plugin subtype.
pub type PluginCtor =
    Arc<dyn Fn(&PluginSpec) -> Result<PluginHandle, FrameworkError> + Send + Sync>;

/// Thread-safe creator table. Stateless apart from the table itself.
#[derive(Default)]
pub struct PluginFactory {
    creators: RwLock<HashMap<String, PluginCtor>>,
}

impl PluginFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for a subtype kind, replacing any
    /// previous one.
    pub fn register_creator<F>(&self, kind: impl Into<String>, creator: F)
    where
        F: Fn(&PluginSpec) -> Result<PluginHandle, FrameworkError> + Send + Sync + 'static,
    {
        self.creators.write().insert(kind.into(), Arc::new(creator));
    }

    /// Constructs a plugin from its declared spec.
    ///
    /// The spec's `type` tag selects the constructor. An unknown kind is
    /// a plugin-kind failure; a constructor failure is wrapped with
    /// factory context.
    pub fn create(&self, spec: &PluginSpec) -> Result<PluginHandle, FrameworkError> {
        let kind = spec.params.kind();
        let creator = self.creators.read().get(kind).cloned();
        let Some(creator) = creator else {
            return Err(FrameworkError::plugin(
                "factory",
                "create",
                format!("unknown plugin type: {kind}"),
            ));
        };

        creator(spec).map_err(|e| {
            FrameworkError::wrap(
                e,
                vigil_types::ErrorKind::Plugin,
                "factory",
                "create",
                format!("failed to create plugin {}", spec.name),
            )
        })
    }

    /// All registered subtype kinds, sorted.
    #[must_use]
    pub fn supported_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.creators.read().keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
