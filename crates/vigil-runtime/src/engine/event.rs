//! Framework lifecycle events.
//!
//! The engine broadcasts an event when plugins are loaded or unloaded and
//! when the framework starts or stops. Hosts subscribe via
//! [`Engine::subscribe_events`](crate::Engine::subscribe_events); events
//! are best-effort and dropped when no subscriber is listening.

use serde::Serialize;
use vigil_plugin::PluginRole;

/// A lifecycle event emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameworkEvent {
    /// A plugin was registered.
    PluginLoaded { plugin: String, role: PluginRole },
    /// A plugin was stopped (best-effort) and unregistered.
    PluginUnloaded { plugin: String, role: PluginRole },
    /// The engine started.
    FrameworkStarted { plugin_count: usize },
    /// The engine stopped.
    FrameworkStopped { uptime_secs: u64 },
}
