//! Configuration loader with environment overrides.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Configuration file (TOML), when one is set
//! 3. Environment variables (`AGENT_*`)
//!
//! Each layer overrides the previous; the merged result is validated
//! before it is returned.
//!
//! # Environment Variables
//!
//! Every [`FrameworkConfig`] field maps to `AGENT_<FIELD_NAME>`
//! (`AGENT_LOG_LEVEL`, `AGENT_SERVER_PORT`, `AGENT_SHUTDOWN_TIMEOUT`, …)
//! and every typed plugin-config field maps the same way
//! (`AGENT_API_KEY`, `AGENT_WINDOW_SIZE`, …), applied to each declared
//! plugin entry of the matching variant.

use super::FrameworkConfig;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use vigil_types::FrameworkError;

/// Builder-style configuration loader.
///
/// # Example
///
/// ```no_run
/// use vigil_runtime::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_path("vigil.toml")
///     .load()
///     .expect("config");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a loader with no file and environment overrides enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file. The file must exist and parse; use
    /// no path at all for an environment-only load.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Skips environment overrides. Useful for deterministic tests.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads, merges, and validates the configuration.
    pub fn load(&self) -> Result<FrameworkConfig, FrameworkError> {
        let mut config = match &self.path {
            Some(path) => load_file(path)?,
            None => FrameworkConfig::default(),
        };

        if !self.skip_env {
            apply_env(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn load_file(path: &Path) -> Result<FrameworkConfig, FrameworkError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        FrameworkError::wrap(
            e,
            vigil_types::ErrorKind::Configuration,
            "config",
            "load",
            format!("failed to read config file {}", path.display()),
        )
    })?;
    debug!(path = %path.display(), "loaded configuration file");
    FrameworkConfig::from_toml(&text)
}

/// Replaces `field` with the parsed value of `var` when the variable is set.
fn env_override<T>(var: &str, field: &mut T) -> Result<(), FrameworkError>
where
    T: FromStr,
    T::Err: Display,
{
    if let Ok(raw) = std::env::var(var) {
        *field = raw.parse().map_err(|e| {
            FrameworkError::configuration(
                "config",
                "env-parse",
                format!("invalid value for {var}: {e}"),
            )
        })?;
    }
    Ok(())
}

fn apply_env(config: &mut FrameworkConfig) -> Result<(), FrameworkError> {
    env_override("AGENT_LOG_LEVEL", &mut config.log_level)?;
    env_override("AGENT_LOG_FORMAT", &mut config.log_format)?;
    env_override("AGENT_LOG_OUTPUT", &mut config.log_output)?;
    env_override("AGENT_SERVER_HOST", &mut config.server_host)?;
    env_override("AGENT_SERVER_PORT", &mut config.server_port)?;
    env_override("AGENT_DEFAULT_AGENT", &mut config.default_agent)?;
    env_override("AGENT_HEALTH_CHECK_TIMEOUT", &mut config.health_check_timeout)?;
    env_override("AGENT_DATA_CHANNEL_SIZE", &mut config.data_channel_size)?;
    env_override("AGENT_WORKER_POOL_SIZE", &mut config.worker_pool_size)?;
    env_override("AGENT_SHUTDOWN_TIMEOUT", &mut config.shutdown_timeout)?;

    for spec in &mut config.plugins {
        spec.params.apply_env()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests that touch AGENT_* variables serialize on this lock; the
    // process environment is shared across the test binary.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("vigil.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_defaults_only() {
        let config = ConfigLoader::new().skip_env_vars().load().unwrap();
        assert_eq!(config, FrameworkConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
log_level = "warn"
server_port = 9999

[[plugins]]
name = "detector"
type = "statistical"

[plugins.config]
threshold = 3.0
"#,
        );

        let config = ConfigLoader::new()
            .with_path(&path)
            .skip_env_vars()
            .load()
            .unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.server_port, 9999);
        assert_eq!(config.plugins.len(), 1);
        assert_eq!(config.plugins[0].params.kind(), "statistical");
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = ConfigLoader::new()
            .with_path("/nonexistent/vigil.toml")
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert_eq!(err.kind(), vigil_types::ErrorKind::Configuration);
    }

    #[test]
    fn invalid_file_content_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "server_port = 0");
        let err = ConfigLoader::new()
            .with_path(&path)
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert_eq!(err.kind(), vigil_types::ErrorKind::Validation);
    }

    #[test]
    fn env_overrides_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "server_port = 9001");

        std::env::set_var("AGENT_SERVER_PORT", "9002");
        let config = ConfigLoader::new().with_path(&path).load().unwrap();
        std::env::remove_var("AGENT_SERVER_PORT");

        assert_eq!(config.server_port, 9002);
    }

    #[test]
    fn malformed_env_is_configuration_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("AGENT_DATA_CHANNEL_SIZE", "plenty");
        let err = ConfigLoader::new().load().unwrap_err();
        std::env::remove_var("AGENT_DATA_CHANNEL_SIZE");

        assert_eq!(err.kind(), vigil_types::ErrorKind::Configuration);
    }
}
