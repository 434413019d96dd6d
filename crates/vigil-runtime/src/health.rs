//! Health checker: named async probes with per-check deadlines.
//!
//! Checks run in isolation, each bounded by the configured timeout, and
//! their results aggregate into an overall state:
//!
//! | Check outcome | Result |
//! |---------------|--------|
//! | returned `Ok` | healthy |
//! | failed with a recoverable error (network, timeout kinds) | degraded |
//! | failed with any other error | unhealthy |
//! | exceeded the deadline | unhealthy, reason `timeout` |
//!
//! Aggregation: any unhealthy check makes the whole status unhealthy;
//! otherwise any degraded check makes it degraded; otherwise healthy.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use vigil_runtime::{CheckState, HealthChecker};
//! use vigil_types::FrameworkError;
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let checker = HealthChecker::new(Duration::from_secs(5));
//! checker.register_check("disk", || Box::pin(async { Ok(()) }));
//! checker.register_check("upstream", || {
//!     Box::pin(async { Err(FrameworkError::network("health", "check", "refused")) })
//! });
//!
//! let status = checker.check_all().await;
//! assert_eq!(status.state, CheckState::Degraded);
//! # }
//! ```

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use vigil_types::FrameworkError;

/// Default per-check deadline when the configured timeout is zero.
const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Future returned by a health check.
pub type CheckFuture = Pin<Box<dyn Future<Output = Result<(), FrameworkError>> + Send>>;

/// A registered health check.
pub type HealthCheck = Arc<dyn Fn() -> CheckFuture + Send + Sync>;

/// Outcome classification for a check or the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        };
        f.write_str(name)
    }
}

/// Result of one health check run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub state: CheckState,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated health of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub state: CheckState,
    pub message: String,
    pub checks: BTreeMap<String, CheckResult>,
    pub timestamp: DateTime<Utc>,
}

/// Runs registered checks under a shared per-check timeout.
pub struct HealthChecker {
    checks: RwLock<BTreeMap<String, HealthCheck>>,
    timeout: Duration,
}

impl HealthChecker {
    /// Creates a checker. A zero timeout falls back to 5 seconds.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() {
            DEFAULT_CHECK_TIMEOUT
        } else {
            timeout
        };
        Self {
            checks: RwLock::new(BTreeMap::new()),
            timeout,
        }
    }

    /// Registers a named check, replacing any previous one.
    pub fn register_check<F>(&self, name: impl Into<String>, check: F)
    where
        F: Fn() -> CheckFuture + Send + Sync + 'static,
    {
        self.checks.write().insert(name.into(), Arc::new(check));
    }

    /// Removes a named check.
    pub fn unregister_check(&self, name: &str) {
        self.checks.write().remove(name);
    }

    /// Runs every registered check and aggregates the results.
    pub async fn check_all(&self) -> HealthStatus {
        let checks: Vec<(String, HealthCheck)> = self
            .checks
            .read()
            .iter()
            .map(|(name, check)| (name.clone(), Arc::clone(check)))
            .collect();

        let mut results = BTreeMap::new();
        for (name, check) in checks {
            let result = self.run_check(&check).await;
            results.insert(name, result);
        }

        let (state, message) = aggregate(&results);
        HealthStatus {
            state,
            message,
            checks: results,
            timestamp: Utc::now(),
        }
    }

    async fn run_check(&self, check: &HealthCheck) -> CheckResult {
        match tokio::time::timeout(self.timeout, check()).await {
            Ok(Ok(())) => CheckResult {
                state: CheckState::Healthy,
                message: "check passed".into(),
                error: None,
            },
            Ok(Err(err)) => {
                let state = if err.is_recoverable() {
                    CheckState::Degraded
                } else {
                    CheckState::Unhealthy
                };
                CheckResult {
                    state,
                    message: "check failed".into(),
                    error: Some(err.to_string()),
                }
            }
            Err(_) => CheckResult {
                state: CheckState::Unhealthy,
                message: "check timed out".into(),
                error: Some("timeout".into()),
            },
        }
    }
}

fn aggregate(results: &BTreeMap<String, CheckResult>) -> (CheckState, String) {
    let mut state = CheckState::Healthy;
    for result in results.values() {
        match result.state {
            CheckState::Unhealthy => return (CheckState::Unhealthy, "one or more checks failed".into()),
            CheckState::Degraded => state = CheckState::Degraded,
            CheckState::Healthy => {}
        }
    }
    let message = match state {
        CheckState::Healthy => "all checks passed".into(),
        CheckState::Degraded => "one or more checks are degraded".into(),
        CheckState::Unhealthy => unreachable!("handled above"),
    };
    (state, message)
}
