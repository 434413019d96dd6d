//! Declared plugins and their typed configuration records.
//!
//! A configuration file declares plugins as a list of [`PluginSpec`]
//! entries. The role-specific `config` payload is a sum type keyed on the
//! `type` tag, so a misconfigured plugin fails at load time rather than
//! when the pipeline first touches it:
//!
//! ```toml
//! [[plugins]]
//! name = "cpu-metrics"
//! type = "scrape"
//!
//! [plugins.config]
//! endpoint = "http://localhost:9090"
//! scrape_interval = 30
//! timeout = 10
//! queries = ["up", "cpu_usage_percent"]
//! ```
//!
//! The `type` tag doubles as the factory key: the factory constructs a
//! `scrape` entry with the scrape-collector creator, and an unknown tag
//! is rejected by serde before the factory is ever consulted.
//!
//! # Environment overrides
//!
//! Every typed field is also addressable via an `AGENT_`-prefixed
//! uppercase variable matching the field name (`AGENT_ENDPOINT`,
//! `AGENT_MAX_TOKENS`, …). When both file and environment supply a
//! value, the environment wins. Overrides apply to every declared entry
//! of the matching variant.

use crate::PluginRole;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use vigil_types::{FrameworkError, Severity};

fn default_true() -> bool {
    true
}

/// A declared plugin: name, enabled flag, and typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Unique non-empty plugin name.
    pub name: String,
    /// Disabled entries are kept in the configuration but never loaded.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Role-specific typed configuration, tagged by subtype.
    #[serde(flatten)]
    pub params: PluginParams,
}

impl PluginSpec {
    /// Validates the name and the typed parameters.
    pub fn validate(&self) -> Result<(), FrameworkError> {
        if self.name.trim().is_empty() {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                "plugin name must not be empty",
            ));
        }
        self.params.validate(&self.name)
    }
}

/// Role-specific plugin configuration, keyed on the subtype tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum PluginParams {
    /// HTTP metrics-scraping collector.
    Scrape(ScrapeConfig),
    /// Statistical anomaly analyzer.
    Statistical(StatisticalConfig),
    /// Logging responder.
    Log(LogSinkConfig),
    /// LLM-backed agent.
    Llm(LlmConfig),
}

impl PluginParams {
    /// The subtype tag, which is also the factory key.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scrape(_) => "scrape",
            Self::Statistical(_) => "statistical",
            Self::Log(_) => "log",
            Self::Llm(_) => "llm",
        }
    }

    /// The role this subtype belongs to.
    #[must_use]
    pub fn role(&self) -> PluginRole {
        match self {
            Self::Scrape(_) => PluginRole::Collector,
            Self::Statistical(_) => PluginRole::Analyzer,
            Self::Log(_) => PluginRole::Responder,
            Self::Llm(_) => PluginRole::Agent,
        }
    }

    /// Validates the variant's fields.
    pub fn validate(&self, plugin: &str) -> Result<(), FrameworkError> {
        match self {
            Self::Scrape(c) => c.validate(plugin),
            Self::Statistical(c) => c.validate(plugin),
            Self::Log(c) => c.validate(plugin),
            Self::Llm(c) => c.validate(plugin),
        }
    }

    /// Applies `AGENT_*` environment overrides to the variant's fields.
    pub fn apply_env(&mut self) -> Result<(), FrameworkError> {
        match self {
            Self::Scrape(c) => c.apply_env(),
            Self::Statistical(c) => c.apply_env(),
            Self::Log(c) => c.apply_env(),
            Self::Llm(c) => c.apply_env(),
        }
    }
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

/// Configuration for the HTTP metrics-scraping collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Base URL of the metrics endpoint.
    pub endpoint: String,
    /// Seconds between scrapes.
    pub scrape_interval: u64,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    /// Queries to evaluate on each scrape.
    pub queries: Vec<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9090".into(),
            scrape_interval: 30,
            timeout: 10,
            queries: vec![
                "up".into(),
                "cpu_usage_percent".into(),
                "memory_usage_percent".into(),
            ],
        }
    }
}

impl ScrapeConfig {
    fn validate(&self, plugin: &str) -> Result<(), FrameworkError> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                format!("{plugin}: endpoint must be an http(s) URL"),
            )
            .with_context("endpoint", &self.endpoint));
        }
        if self.scrape_interval == 0 {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                format!("{plugin}: scrape_interval must be at least 1 second"),
            ));
        }
        if self.timeout == 0 {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                format!("{plugin}: timeout must be at least 1 second"),
            ));
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), FrameworkError> {
        env_override("AGENT_ENDPOINT", &mut self.endpoint)?;
        env_override("AGENT_SCRAPE_INTERVAL", &mut self.scrape_interval)?;
        env_override("AGENT_TIMEOUT", &mut self.timeout)?;
        if let Ok(raw) = std::env::var("AGENT_QUERIES") {
            self.queries = raw
                .split(',')
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }
}

/// Configuration for the statistical anomaly analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalConfig {
    /// Detection threshold: a fraction in `(0, 1]` or a positive sigma
    /// multiplier, depending on the algorithm.
    pub threshold: f64,
    /// Maximum number of trailing samples considered per batch.
    pub window_size: usize,
    /// Algorithm tag.
    pub algorithm: String,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            window_size: 100,
            algorithm: "statistical".into(),
        }
    }
}

impl StatisticalConfig {
    fn validate(&self, plugin: &str) -> Result<(), FrameworkError> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                format!("{plugin}: threshold must be a positive finite number"),
            )
            .with_context("threshold", self.threshold.to_string()));
        }
        if self.window_size == 0 {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                format!("{plugin}: window_size must be at least 1"),
            ));
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), FrameworkError> {
        env_override("AGENT_THRESHOLD", &mut self.threshold)?;
        env_override("AGENT_WINDOW_SIZE", &mut self.window_size)?;
        env_override("AGENT_ALGORITHM", &mut self.algorithm)?;
        Ok(())
    }
}

/// Configuration for the logging responder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSinkConfig {
    /// Analyses below this severity are not handled.
    pub min_severity: Severity,
    /// Output format tag: `text` or `json`.
    pub format: String,
    /// Output target: `stdout`, `stderr`, or a file path.
    pub output: String,
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            min_severity: Severity::Low,
            format: "text".into(),
            output: "stdout".into(),
        }
    }
}

impl LogSinkConfig {
    fn validate(&self, plugin: &str) -> Result<(), FrameworkError> {
        if !matches!(self.format.as_str(), "text" | "json") {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                format!("{plugin}: format must be one of: text, json"),
            )
            .with_context("format", &self.format));
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), FrameworkError> {
        env_override("AGENT_MIN_SEVERITY", &mut self.min_severity)?;
        env_override("AGENT_FORMAT", &mut self.format)?;
        env_override("AGENT_OUTPUT", &mut self.output)?;
        Ok(())
    }
}

/// Configuration for the LLM-backed agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name.
    pub model: String,
    /// Maximum completion tokens, 1 to 4000.
    pub max_tokens: u32,
    /// Sampling temperature, 0.0 to 2.0.
    pub temperature: f64,
    /// API key. May be empty in the file and supplied via
    /// `AGENT_API_KEY`; the agent fails its start health probe without
    /// one.
    pub api_key: String,
    /// Base URL of an OpenAI-compatible API.
    pub api_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".into(),
            max_tokens: 1000,
            temperature: 0.7,
            api_key: String::new(),
            api_url: "https://api.openai.com/v1".into(),
        }
    }
}

impl LlmConfig {
    fn validate(&self, plugin: &str) -> Result<(), FrameworkError> {
        if self.model.trim().is_empty() {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                format!("{plugin}: model must not be empty"),
            ));
        }
        if !(1..=4000).contains(&self.max_tokens) {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                format!("{plugin}: max_tokens must be between 1 and 4000"),
            )
            .with_context("max_tokens", self.max_tokens.to_string()));
        }
        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                format!("{plugin}: temperature must be between 0.0 and 2.0"),
            )
            .with_context("temperature", self.temperature.to_string()));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(FrameworkError::validation(
                "config",
                "validate-plugin",
                format!("{plugin}: api_url must be an http(s) URL"),
            ));
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), FrameworkError> {
        env_override("AGENT_MODEL", &mut self.model)?;
        env_override("AGENT_MAX_TOKENS", &mut self.max_tokens)?;
        env_override("AGENT_TEMPERATURE", &mut self.temperature)?;
        env_override("AGENT_API_KEY", &mut self.api_key)?;
        env_override("AGENT_API_URL", &mut self.api_url)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrape_spec() -> PluginSpec {
        PluginSpec {
            name: "cpu".into(),
            enabled: true,
            params: PluginParams::Scrape(ScrapeConfig::default()),
        }
    }

    #[test]
    fn kind_and_role_agree() {
        let cases = [
            (PluginParams::Scrape(ScrapeConfig::default()), "scrape", PluginRole::Collector),
            (
                PluginParams::Statistical(StatisticalConfig::default()),
                "statistical",
                PluginRole::Analyzer,
            ),
            (PluginParams::Log(LogSinkConfig::default()), "log", PluginRole::Responder),
            (PluginParams::Llm(LlmConfig::default()), "llm", PluginRole::Agent),
        ];
        for (params, kind, role) in cases {
            assert_eq!(params.kind(), kind);
            assert_eq!(params.role(), role);
        }
    }

    #[test]
    fn defaults_validate() {
        for params in [
            PluginParams::Scrape(ScrapeConfig::default()),
            PluginParams::Statistical(StatisticalConfig::default()),
            PluginParams::Log(LogSinkConfig::default()),
            PluginParams::Llm(LlmConfig::default()),
        ] {
            params.validate("p").unwrap();
        }
    }

    #[test]
    fn empty_name_rejected() {
        let mut spec = scrape_spec();
        spec.name = "  ".into();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn scrape_validation() {
        let mut config = ScrapeConfig::default();
        config.endpoint = "ftp://nope".into();
        assert!(config.validate("p").is_err());

        let mut config = ScrapeConfig::default();
        config.scrape_interval = 0;
        assert!(config.validate("p").is_err());
    }

    #[test]
    fn statistical_validation() {
        let mut config = StatisticalConfig::default();
        config.threshold = 0.0;
        assert!(config.validate("p").is_err());

        let mut config = StatisticalConfig::default();
        config.threshold = f64::NAN;
        assert!(config.validate("p").is_err());

        let mut config = StatisticalConfig::default();
        config.window_size = 0;
        assert!(config.validate("p").is_err());
    }

    #[test]
    fn log_sink_validation() {
        let mut config = LogSinkConfig::default();
        config.format = "xml".into();
        assert!(config.validate("p").is_err());
    }

    #[test]
    fn llm_validation_bounds() {
        let mut config = LlmConfig::default();
        config.max_tokens = 0;
        assert!(config.validate("p").is_err());

        let mut config = LlmConfig::default();
        config.max_tokens = 4001;
        assert!(config.validate("p").is_err());

        let mut config = LlmConfig::default();
        config.temperature = 2.5;
        assert!(config.validate("p").is_err());

        let mut config = LlmConfig::default();
        config.max_tokens = 4000;
        config.temperature = 2.0;
        config.validate("p").unwrap();
    }

    #[test]
    fn toml_parse_tagged_config() {
        let toml = r#"
name = "cpu-metrics"
type = "scrape"

[config]
endpoint = "http://metrics:9090"
scrape_interval = 15
"#;
        let spec: PluginSpec = toml::from_str(toml).unwrap();
        assert_eq!(spec.name, "cpu-metrics");
        assert!(spec.enabled, "enabled defaults to true");
        match &spec.params {
            PluginParams::Scrape(c) => {
                assert_eq!(c.endpoint, "http://metrics:9090");
                assert_eq!(c.scrape_interval, 15);
                assert_eq!(c.timeout, 10, "unset fields take defaults");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn toml_unknown_type_rejected() {
        let toml = r#"
name = "mystery"
type = "quantum"

[config]
"#;
        assert!(toml::from_str::<PluginSpec>(toml).is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let spec = PluginSpec {
            name: "detector".into(),
            enabled: false,
            params: PluginParams::Statistical(StatisticalConfig::default()),
        };
        let text = toml::to_string(&spec).unwrap();
        let back: PluginSpec = toml::from_str(&text).unwrap();
        assert_eq!(spec, back);
    }

    #[test]
    fn env_override_wins() {
        // Serial with respect to other env tests by using unique names.
        std::env::set_var("AGENT_WINDOW_SIZE", "7");
        let mut params = PluginParams::Statistical(StatisticalConfig::default());
        params.apply_env().unwrap();
        match &params {
            PluginParams::Statistical(c) => assert_eq!(c.window_size, 7),
            other => panic!("wrong variant: {other:?}"),
        }
        std::env::remove_var("AGENT_WINDOW_SIZE");
    }

    #[test]
    fn env_override_malformed_is_configuration_error() {
        std::env::set_var("AGENT_MAX_TOKENS", "lots");
        let mut params = PluginParams::Llm(LlmConfig::default());
        let err = params.apply_env().unwrap_err();
        assert_eq!(err.kind(), vigil_types::ErrorKind::Configuration);
        std::env::remove_var("AGENT_MAX_TOKENS");
    }
}
