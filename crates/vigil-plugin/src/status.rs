//! Plugin lifecycle status and the state machine that guards it.
//!
//! # Status Lifecycle
//!
//! ```text
//!  stopped ──configure──► stopped
//!  stopped ──start───────► starting ──(ok)──► running
//!                            │
//!                            └──(fail)──► error
//!  running ──stop────────► stopping ──► stopped
//!  running ──internal fail─► error
//!  error   ──stop (force)─► stopped
//! ```
//!
//! Only `running` plugins participate in the pipeline. Transitioning into
//! or out of `running` is the sole synchronization point; all other
//! operations on a plugin are advisory.
//!
//! Plugin implementations embed a [`Lifecycle`] cell rather than hand-roll
//! the transitions:
//!
//! ```
//! use vigil_plugin::{Lifecycle, PluginStatus};
//!
//! let lifecycle = Lifecycle::new();
//! assert_eq!(lifecycle.status(), PluginStatus::Stopped);
//!
//! lifecycle.begin_start("demo").unwrap();
//! lifecycle.complete_start();
//! assert_eq!(lifecycle.status(), PluginStatus::Running);
//!
//! // Starting again is a recognizable failure, state unchanged.
//! assert!(lifecycle.begin_start("demo").is_err());
//! assert_eq!(lifecycle.status(), PluginStatus::Running);
//!
//! lifecycle.begin_stop("demo").unwrap();
//! lifecycle.complete_stop();
//! assert_eq!(lifecycle.status(), PluginStatus::Stopped);
//! ```

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use vigil_types::FrameworkError;

/// A plugin's position in the lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    /// Not running; accepts `configure` and `start`.
    #[default]
    Stopped,
    /// `start` in progress.
    Starting,
    /// Participating in the pipeline.
    Running,
    /// `stop` in progress.
    Stopping,
    /// A start or internal failure occurred; `stop` force-resets.
    Error,
}

impl PluginStatus {
    /// Whether the plugin participates in the pipeline.
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether the plugin is settled (no transition in progress).
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Stopped | Self::Running | Self::Error)
    }

    /// Whether `from → to` is a legal transition in the state machine.
    #[must_use]
    pub fn can_transition(from: PluginStatus, to: PluginStatus) -> bool {
        use PluginStatus::*;
        matches!(
            (from, to),
            (Stopped, Starting)
                | (Starting, Running)
                | (Starting, Error)
                | (Running, Stopping)
                | (Running, Error)
                | (Stopping, Stopped)
                | (Error, Stopping)
        )
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Thread-safe lifecycle cell enforcing the plugin state machine.
///
/// Guards start/stop idempotence: starting an already-running plugin and
/// stopping a stopped one are internal-kind failures with state unchanged.
#[derive(Debug, Default)]
pub struct Lifecycle {
    status: RwLock<PluginStatus>,
}

impl Lifecycle {
    /// Creates a cell in the `Stopped` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> PluginStatus {
        *self.status.read()
    }

    /// `stopped | error → starting`. Fails if already starting or running.
    pub fn begin_start(&self, plugin: &str) -> Result<(), FrameworkError> {
        let mut status = self.status.write();
        match *status {
            PluginStatus::Running | PluginStatus::Starting => Err(FrameworkError::internal(
                "plugin",
                "start",
                format!("{plugin} is already running"),
            )),
            PluginStatus::Stopping => Err(FrameworkError::internal(
                "plugin",
                "start",
                format!("{plugin} is stopping"),
            )),
            PluginStatus::Stopped | PluginStatus::Error => {
                *status = PluginStatus::Starting;
                Ok(())
            }
        }
    }

    /// `starting → running`.
    pub fn complete_start(&self) {
        *self.status.write() = PluginStatus::Running;
    }

    /// Marks a start or internal failure: `→ error`.
    pub fn fail(&self) {
        *self.status.write() = PluginStatus::Error;
    }

    /// `running → stopping`, or force-stop out of `error`.
    /// Fails if the plugin is not running.
    pub fn begin_stop(&self, plugin: &str) -> Result<(), FrameworkError> {
        let mut status = self.status.write();
        match *status {
            PluginStatus::Running | PluginStatus::Error => {
                *status = PluginStatus::Stopping;
                Ok(())
            }
            _ => Err(FrameworkError::internal(
                "plugin",
                "stop",
                format!("{plugin} is not running"),
            )),
        }
    }

    /// `stopping → stopped`.
    pub fn complete_stop(&self) {
        *self.status.write() = PluginStatus::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::ErrorKind;

    #[test]
    fn default_is_stopped() {
        assert_eq!(PluginStatus::default(), PluginStatus::Stopped);
        assert_eq!(Lifecycle::new().status(), PluginStatus::Stopped);
    }

    #[test]
    fn display_lowercase() {
        assert_eq!(PluginStatus::Running.to_string(), "running");
        assert_eq!(PluginStatus::Error.to_string(), "error");
    }

    #[test]
    fn transition_table() {
        use PluginStatus::*;
        let legal = [
            (Stopped, Starting),
            (Starting, Running),
            (Starting, Error),
            (Running, Stopping),
            (Running, Error),
            (Stopping, Stopped),
            (Error, Stopping),
        ];
        let all = [Stopped, Starting, Running, Stopping, Error];
        for from in all {
            for to in all {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    PluginStatus::can_transition(from, to),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn happy_path() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start("p").unwrap();
        assert_eq!(lifecycle.status(), PluginStatus::Starting);
        lifecycle.complete_start();
        assert_eq!(lifecycle.status(), PluginStatus::Running);
        lifecycle.begin_stop("p").unwrap();
        assert_eq!(lifecycle.status(), PluginStatus::Stopping);
        lifecycle.complete_stop();
        assert_eq!(lifecycle.status(), PluginStatus::Stopped);
    }

    #[test]
    fn double_start_is_internal_error() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start("p").unwrap();
        lifecycle.complete_start();

        let err = lifecycle.begin_start("p").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(lifecycle.status(), PluginStatus::Running);
    }

    #[test]
    fn stop_when_stopped_is_internal_error() {
        let lifecycle = Lifecycle::new();
        let err = lifecycle.begin_stop("p").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(lifecycle.status(), PluginStatus::Stopped);
    }

    #[test]
    fn start_failure_lands_in_error() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start("p").unwrap();
        lifecycle.fail();
        assert_eq!(lifecycle.status(), PluginStatus::Error);
    }

    #[test]
    fn force_stop_out_of_error() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start("p").unwrap();
        lifecycle.fail();

        lifecycle.begin_stop("p").unwrap();
        lifecycle.complete_stop();
        assert_eq!(lifecycle.status(), PluginStatus::Stopped);
    }

    #[test]
    fn restart_after_error() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start("p").unwrap();
        lifecycle.fail();

        // A plugin in error may be started again directly.
        lifecycle.begin_start("p").unwrap();
        lifecycle.complete_start();
        assert_eq!(lifecycle.status(), PluginStatus::Running);
    }
}
