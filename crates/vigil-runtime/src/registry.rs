//! Name-unique plugin registry with role-indexed views.
//!
//! The registry exclusively owns the plugin handles for their lifetime in
//! the engine. All operations are safe for concurrent callers: readers
//! (lookup, enumeration) proceed in parallel, writers (register,
//! unregister) serialize on the write lock. Enumeration order is
//! unspecified; callers needing determinism sort by name.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use vigil_plugin::{Agent, Analyzer, Collector, PluginHandle, PluginRole, Responder};
use vigil_types::FrameworkError;

/// Maps plugin name to handle. Duplicate registration is a
/// validation-kind failure; unregistering an unknown name is a
/// plugin-kind failure.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, PluginHandle>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under its name.
    pub fn register(&self, handle: PluginHandle) -> Result<(), FrameworkError> {
        let name = handle.name();
        let mut plugins = self.plugins.write();
        if plugins.contains_key(&name) {
            return Err(FrameworkError::validation(
                "registry",
                "register",
                format!("plugin {name} already registered"),
            ));
        }
        plugins.insert(name, handle);
        Ok(())
    }

    /// Removes a plugin by name, returning its handle.
    pub fn unregister(&self, name: &str) -> Result<PluginHandle, FrameworkError> {
        self.plugins.write().remove(name).ok_or_else(|| {
            FrameworkError::plugin(
                "registry",
                "unregister",
                format!("plugin {name} not found"),
            )
        })
    }

    /// Looks up a plugin by name.
    pub fn get(&self, name: &str) -> Result<PluginHandle, FrameworkError> {
        self.plugins.read().get(name).cloned().ok_or_else(|| {
            FrameworkError::plugin("registry", "get", format!("plugin {name} not found"))
        })
    }

    /// All registered plugins.
    #[must_use]
    pub fn list(&self) -> Vec<PluginHandle> {
        self.plugins.read().values().cloned().collect()
    }

    /// All plugins of the given role.
    #[must_use]
    pub fn list_by_role(&self, role: PluginRole) -> Vec<PluginHandle> {
        self.plugins
            .read()
            .values()
            .filter(|handle| handle.role() == role)
            .cloned()
            .collect()
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn count(&self) -> usize {
        self.plugins.read().len()
    }

    /// Number of plugins of the given role.
    #[must_use]
    pub fn count_by_role(&self, role: PluginRole) -> usize {
        self.plugins
            .read()
            .values()
            .filter(|handle| handle.role() == role)
            .count()
    }

    /// Typed view of every collector.
    #[must_use]
    pub fn collectors(&self) -> Vec<Arc<dyn Collector>> {
        self.plugins
            .read()
            .values()
            .filter_map(PluginHandle::as_collector)
            .collect()
    }

    /// Typed view of every analyzer.
    #[must_use]
    pub fn analyzers(&self) -> Vec<Arc<dyn Analyzer>> {
        self.plugins
            .read()
            .values()
            .filter_map(PluginHandle::as_analyzer)
            .collect()
    }

    /// Typed view of every responder.
    #[must_use]
    pub fn responders(&self) -> Vec<Arc<dyn Responder>> {
        self.plugins
            .read()
            .values()
            .filter_map(PluginHandle::as_responder)
            .collect()
    }

    /// Typed view of every agent.
    #[must_use]
    pub fn agents(&self) -> Vec<Arc<dyn Agent>> {
        self.plugins
            .read()
            .values()
            .filter_map(PluginHandle::as_agent)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vigil_plugin::testing::{EchoAgent, FlagAnalyzer, RecordingResponder, ScriptedCollector};
    use vigil_types::ErrorKind;

    fn collector(name: &str) -> PluginHandle {
        PluginHandle::Collector(Arc::new(ScriptedCollector::new(
            name,
            Duration::from_secs(1),
            vec![],
        )))
    }

    #[test]
    fn register_and_get() {
        let registry = PluginRegistry::new();
        registry.register(collector("c1")).unwrap();

        let handle = registry.get("c1").unwrap();
        assert_eq!(handle.name(), "c1");
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn duplicate_registration_is_validation_error() {
        let registry = PluginRegistry::new();
        registry.register(collector("c1")).unwrap();

        let err = registry.register(collector("c1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn unregister_unknown_is_plugin_error() {
        let registry = PluginRegistry::new();
        let err = registry.unregister("ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Plugin);
    }

    #[test]
    fn get_unknown_is_plugin_error() {
        let registry = PluginRegistry::new();
        let err = registry.get("ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Plugin);
    }

    #[test]
    fn register_unregister_register_roundtrip() {
        let registry = PluginRegistry::new();
        registry.register(collector("c1")).unwrap();
        registry.unregister("c1").unwrap();
        registry.register(collector("c1")).unwrap();
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn role_views_and_counts() {
        let registry = PluginRegistry::new();
        registry.register(collector("c1")).unwrap();
        registry.register(collector("c2")).unwrap();
        registry
            .register(PluginHandle::Analyzer(Arc::new(FlagAnalyzer::new("a1"))))
            .unwrap();
        registry
            .register(PluginHandle::Responder(Arc::new(RecordingResponder::new("r1"))))
            .unwrap();
        registry
            .register(PluginHandle::Agent(Arc::new(EchoAgent::new("ai"))))
            .unwrap();

        assert_eq!(registry.count(), 5);
        assert_eq!(registry.count_by_role(PluginRole::Collector), 2);
        assert_eq!(registry.count_by_role(PluginRole::Analyzer), 1);
        assert_eq!(registry.count_by_role(PluginRole::Responder), 1);
        assert_eq!(registry.count_by_role(PluginRole::Agent), 1);

        assert_eq!(registry.collectors().len(), 2);
        assert_eq!(registry.analyzers().len(), 1);
        assert_eq!(registry.responders().len(), 1);
        assert_eq!(registry.agents().len(), 1);
        assert_eq!(registry.list_by_role(PluginRole::Collector).len(), 2);
    }

    #[test]
    fn concurrent_registrations_and_enumerations() {
        let registry = Arc::new(PluginRegistry::new());
        let mut handles = Vec::new();

        for i in 0..10 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                registry.register(collector(&format!("c{i}"))).unwrap();
            }));
        }
        for _ in 0..10 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                // Every observed snapshot is internally consistent: each
                // handle resolves by name and the count matches.
                let listed = registry.list();
                for handle in &listed {
                    assert!(registry.get(&handle.name()).is_ok());
                }
                assert!(listed.len() <= 10);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.count(), 10);
    }
}
