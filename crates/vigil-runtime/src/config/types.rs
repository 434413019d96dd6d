//! Engine-wide configuration.
//!
//! All fields have compile-time defaults; a configuration file only needs
//! to state what differs. Durations are whole seconds.

use serde::{Deserialize, Serialize};
use vigil_plugin::{
    LlmConfig, LogSinkConfig, PluginParams, PluginSpec, ScrapeConfig, StatisticalConfig,
};
use vigil_types::FrameworkError;

/// Engine-wide configuration.
///
/// # Example
///
/// ```
/// use vigil_runtime::FrameworkConfig;
///
/// let config = FrameworkConfig::from_toml("server_port = 8080").unwrap();
/// assert_eq!(config.server_port, 8080);
/// assert_eq!(config.log_level, "info"); // default
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Log level: `debug`, `info`, `warn`, or `error`.
    pub log_level: String,
    /// Log format: `text` or `json`.
    pub log_format: String,
    /// Log output: `stdout`, `stderr`, or a file path.
    pub log_output: String,
    /// Bind host for the health surface.
    pub server_host: String,
    /// Bind port for the health surface, 1 to 65535.
    pub server_port: u16,
    /// Name of the agent used by the default query path. May be empty.
    pub default_agent: String,
    /// Per-health-check deadline in seconds, at least 1.
    pub health_check_timeout: u64,
    /// Capacity of the bounded data channel, at least 1.
    pub data_channel_size: usize,
    /// Reserved for future use; validated but unused by the pipeline.
    pub worker_pool_size: usize,
    /// Maximum seconds to wait for workers on stop, at least 1.
    pub shutdown_timeout: u64,
    /// Declared plugins.
    pub plugins: Vec<PluginSpec>,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_format: "text".into(),
            log_output: "stdout".into(),
            server_host: "0.0.0.0".into(),
            server_port: 9090,
            default_agent: String::new(),
            health_check_timeout: 5,
            data_channel_size: 100,
            worker_pool_size: 4,
            shutdown_timeout: 30,
            plugins: Vec::new(),
        }
    }
}

impl FrameworkConfig {
    /// A ready-to-edit configuration declaring one plugin of each builtin
    /// subtype. Used by `vigil config create`.
    #[must_use]
    pub fn example() -> Self {
        Self {
            default_agent: "ai-agent".into(),
            plugins: vec![
                PluginSpec {
                    name: "metrics-collector".into(),
                    enabled: true,
                    params: PluginParams::Scrape(ScrapeConfig::default()),
                },
                PluginSpec {
                    name: "anomaly-analyzer".into(),
                    enabled: true,
                    params: PluginParams::Statistical(StatisticalConfig::default()),
                },
                PluginSpec {
                    name: "logger-responder".into(),
                    enabled: true,
                    params: PluginParams::Log(LogSinkConfig::default()),
                },
                PluginSpec {
                    name: "ai-agent".into(),
                    enabled: true,
                    params: PluginParams::Llm(LlmConfig::default()),
                },
            ],
            ..Self::default()
        }
    }

    /// Validates every field and every declared plugin.
    pub fn validate(&self) -> Result<(), FrameworkError> {
        if !matches!(self.log_level.as_str(), "debug" | "info" | "warn" | "error") {
            return Err(FrameworkError::configuration(
                "config",
                "validate",
                format!(
                    "log_level must be one of: debug, info, warn, error (got '{}')",
                    self.log_level
                ),
            ));
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(FrameworkError::configuration(
                "config",
                "validate",
                format!("log_format must be one of: text, json (got '{}')", self.log_format),
            ));
        }
        if self.server_port == 0 {
            return Err(FrameworkError::validation(
                "config",
                "validate",
                "server_port must be between 1 and 65535",
            ));
        }
        if self.health_check_timeout == 0 {
            return Err(FrameworkError::validation(
                "config",
                "validate",
                "health_check_timeout must be at least 1 second",
            ));
        }
        if self.data_channel_size == 0 {
            return Err(FrameworkError::validation(
                "config",
                "validate",
                "data_channel_size must be at least 1",
            ));
        }
        if self.worker_pool_size == 0 {
            return Err(FrameworkError::validation(
                "config",
                "validate",
                "worker_pool_size must be at least 1",
            ));
        }
        if self.shutdown_timeout == 0 {
            return Err(FrameworkError::validation(
                "config",
                "validate",
                "shutdown_timeout must be at least 1 second",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for spec in &self.plugins {
            spec.validate()?;
            if !seen.insert(spec.name.as_str()) {
                return Err(FrameworkError::validation(
                    "config",
                    "validate",
                    format!("duplicate plugin name: {}", spec.name),
                ));
            }
        }
        Ok(())
    }

    /// Serializes to TOML.
    pub fn to_toml(&self) -> Result<String, FrameworkError> {
        toml::to_string_pretty(self).map_err(|e| {
            FrameworkError::wrap(
                e,
                vigil_types::ErrorKind::Configuration,
                "config",
                "serialize",
                "failed to serialize configuration",
            )
        })
    }

    /// Deserializes from TOML; unset fields take defaults.
    pub fn from_toml(text: &str) -> Result<Self, FrameworkError> {
        toml::from_str(text).map_err(|e| {
            FrameworkError::wrap(
                e,
                vigil_types::ErrorKind::Configuration,
                "config",
                "parse",
                "failed to parse configuration",
            )
        })
    }
}
