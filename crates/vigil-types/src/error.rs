//! Unified error model for the Vigil runtime.
//!
//! Every engine-originated failure is a [`FrameworkError`]: a structured
//! value carrying an [`ErrorKind`], the component and operation that
//! produced it, a human-readable message, an optional wrapped cause, an
//! optional context map, and the source location where it was created.
//!
//! # Error Codes
//!
//! Each kind maps to a stable, machine-readable code:
//!
//! | Kind | Code | Recoverable |
//! |------|------|-------------|
//! | [`ErrorKind::Configuration`] | `FRAMEWORK_CONFIGURATION` | No |
//! | [`ErrorKind::Plugin`] | `FRAMEWORK_PLUGIN` | No |
//! | [`ErrorKind::Network`] | `FRAMEWORK_NETWORK` | Yes |
//! | [`ErrorKind::Validation`] | `FRAMEWORK_VALIDATION` | No |
//! | [`ErrorKind::Timeout`] | `FRAMEWORK_TIMEOUT` | Yes |
//! | [`ErrorKind::Internal`] | `FRAMEWORK_INTERNAL` | No |
//!
//! # Recoverability
//!
//! Recoverable errors are transient conditions where a retry may succeed
//! (network failures, deadline overruns). Non-recoverable errors require a
//! code or configuration change.
//!
//! # Example
//!
//! ```
//! use vigil_types::{ErrorKind, FrameworkError};
//!
//! let err = FrameworkError::plugin("registry", "get", "plugin cpu not found")
//!     .with_context("plugin", "cpu");
//!
//! assert_eq!(err.kind(), ErrorKind::Plugin);
//! assert_eq!(err.code(), "FRAMEWORK_PLUGIN");
//! assert!(!err.is_recoverable());
//! assert_eq!(err.context().get("plugin").map(String::as_str), Some("cpu"));
//! ```
//!
//! # Wrapping
//!
//! Wrapping preserves the causal chain so a caller can inspect the
//! original failure via [`std::error::Error::source`]:
//!
//! ```
//! use vigil_types::{ErrorKind, FrameworkError};
//!
//! let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
//! let err = FrameworkError::wrap(io, ErrorKind::Network, "collector", "scrape", "request failed");
//!
//! assert!(std::error::Error::source(&err).is_some());
//! assert!(err.to_string().contains("caused by"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;

/// Classification of an engine-originated failure.
///
/// The kind drives propagation policy: configuration and validation
/// failures halt startup, plugin failures are surfaced per plugin, and
/// network/timeout failures are retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Missing or invalid configuration (bad enum value, unreadable file).
    Configuration,
    /// Plugin-level failure (unknown type, not found, wrong role).
    Plugin,
    /// Network failure (bind error, outbound call failure).
    Network,
    /// Value outside its allowed range, duplicate name.
    Validation,
    /// A deadline expired (health check, shutdown grace).
    Timeout,
    /// State-machine violation or unexpected internal condition.
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code for this kind.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Configuration => "FRAMEWORK_CONFIGURATION",
            Self::Plugin => "FRAMEWORK_PLUGIN",
            Self::Network => "FRAMEWORK_NETWORK",
            Self::Validation => "FRAMEWORK_VALIDATION",
            Self::Timeout => "FRAMEWORK_TIMEOUT",
            Self::Internal => "FRAMEWORK_INTERNAL",
        }
    }

    /// Whether a retry of the failed operation may succeed.
    #[must_use]
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Plugin => "plugin",
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Structured error carrying component and operation context.
///
/// Construct via the per-kind helpers ([`FrameworkError::configuration`],
/// [`FrameworkError::plugin`], …) or wrap a lower-level error with
/// [`FrameworkError::wrap`]. The capture location is recorded from the
/// caller, so helpers report the site that created the error rather than
/// this module.
#[derive(Debug)]
pub struct FrameworkError {
    kind: ErrorKind,
    component: String,
    operation: String,
    message: String,
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    context: HashMap<String, String>,
    file: &'static str,
    line: u32,
}

impl FrameworkError {
    /// Creates a new error of the given kind.
    #[track_caller]
    #[must_use]
    pub fn new(
        kind: ErrorKind,
        component: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let location = Location::caller();
        Self {
            kind,
            component: component.into(),
            operation: operation.into(),
            message: message.into(),
            cause: None,
            context: HashMap::new(),
            file: location.file(),
            line: location.line(),
        }
    }

    /// Wraps an existing error, preserving it as the cause.
    #[track_caller]
    #[must_use]
    pub fn wrap(
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
        kind: ErrorKind,
        component: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(kind, component, operation, message);
        err.cause = Some(cause.into());
        err
    }

    /// Configuration-kind error.
    #[track_caller]
    #[must_use]
    pub fn configuration(
        component: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Configuration, component, operation, message)
    }

    /// Plugin-kind error.
    #[track_caller]
    #[must_use]
    pub fn plugin(
        component: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Plugin, component, operation, message)
    }

    /// Network-kind error.
    #[track_caller]
    #[must_use]
    pub fn network(
        component: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Network, component, operation, message)
    }

    /// Validation-kind error.
    #[track_caller]
    #[must_use]
    pub fn validation(
        component: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Validation, component, operation, message)
    }

    /// Timeout-kind error.
    #[track_caller]
    #[must_use]
    pub fn timeout(
        component: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Timeout, component, operation, message)
    }

    /// Internal-kind error.
    #[track_caller]
    #[must_use]
    pub fn internal(
        component: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Internal, component, operation, message)
    }

    /// Attaches a key/value pair to the error's context map.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// The error's classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Stable machine-readable code (delegates to the kind).
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Whether a retry of the failed operation may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }

    /// The engine component that produced the error.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// The operation that failed.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Additional context attached with [`with_context`](Self::with_context).
    #[must_use]
    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    /// Source file and line where the error was created.
    #[must_use]
    pub fn location(&self) -> (&'static str, u32) {
        (self.file, self.line)
    }
}

impl fmt::Display for FrameworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(
                f,
                "[{}] {}: {} (caused by: {})",
                self.kind, self.component, self.message, cause
            ),
            None => write!(f, "[{}] {}: {}", self.kind, self.component, self.message),
        }
    }
}

impl std::error::Error for FrameworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> [ErrorKind; 6] {
        [
            ErrorKind::Configuration,
            ErrorKind::Plugin,
            ErrorKind::Network,
            ErrorKind::Validation,
            ErrorKind::Timeout,
            ErrorKind::Internal,
        ]
    }

    #[test]
    fn all_codes_are_upper_snake_with_prefix() {
        for kind in all_kinds() {
            let code = kind.code();
            assert!(code.starts_with("FRAMEWORK_"), "bad prefix: {code}");
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'),
                "not UPPER_SNAKE_CASE: {code}"
            );
        }
    }

    #[test]
    fn recoverability() {
        assert!(ErrorKind::Network.is_recoverable());
        assert!(ErrorKind::Timeout.is_recoverable());
        assert!(!ErrorKind::Configuration.is_recoverable());
        assert!(!ErrorKind::Plugin.is_recoverable());
        assert!(!ErrorKind::Validation.is_recoverable());
        assert!(!ErrorKind::Internal.is_recoverable());
    }

    #[test]
    fn display_without_cause() {
        let err = FrameworkError::plugin("registry", "get", "plugin cpu not found");
        assert_eq!(err.to_string(), "[plugin] registry: plugin cpu not found");
    }

    #[test]
    fn display_with_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = FrameworkError::wrap(io, ErrorKind::Network, "collector", "scrape", "request failed");
        let text = err.to_string();
        assert!(text.starts_with("[network] collector: request failed"));
        assert!(text.contains("caused by: refused"));
    }

    #[test]
    fn source_chain_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "root cause");
        let err = FrameworkError::wrap(io, ErrorKind::Internal, "engine", "start", "boom");
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "root cause");
    }

    #[test]
    fn context_accumulates() {
        let err = FrameworkError::validation("config", "validate", "port out of range")
            .with_context("field", "server_port")
            .with_context("value", "0");
        assert_eq!(err.context().len(), 2);
        assert_eq!(err.context()["field"], "server_port");
    }

    #[test]
    fn location_points_at_caller() {
        let err = FrameworkError::internal("engine", "start", "x");
        let (file, line) = err.location();
        assert!(file.ends_with("error.rs"));
        assert!(line > 0);
    }

    #[test]
    fn accessors() {
        let err = FrameworkError::timeout("health", "check", "deadline exceeded");
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.component(), "health");
        assert_eq!(err.operation(), "check");
        assert_eq!(err.message(), "deadline exceeded");
        assert_eq!(err.code(), "FRAMEWORK_TIMEOUT");
        assert!(err.is_recoverable());
    }

    #[test]
    fn kind_display_lowercase() {
        assert_eq!(ErrorKind::Configuration.to_string(), "configuration");
        assert_eq!(ErrorKind::Internal.to_string(), "internal");
    }

    #[test]
    fn kind_serde_roundtrip() {
        for kind in all_kinds() {
            let json = serde_json::to_string(&kind).unwrap();
            let back: ErrorKind = serde_json::from_str(&json).unwrap();
            assert_eq!(kind, back);
        }
        assert_eq!(serde_json::to_string(&ErrorKind::Plugin).unwrap(), "\"plugin\"");
    }
}
