//! Cooperative shutdown signaling.
//!
//! A single root [`ShutdownHandle`] is created by the engine at start;
//! every worker and every plugin receives a cloned [`ShutdownToken`]
//! derived from it. Firing the handle wakes all tokens at once.
//!
//! Workers react at their suspension points:
//!
//! ```
//! use vigil_plugin::ShutdownHandle;
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let handle = ShutdownHandle::new();
//! let token = handle.token();
//!
//! let worker = tokio::spawn(async move {
//!     tokio::select! {
//!         _ = token.cancelled() => "stopped",
//!         _ = tokio::time::sleep(std::time::Duration::from_secs(60)) => "timed out",
//!     }
//! });
//!
//! handle.shutdown();
//! assert_eq!(worker.await.unwrap(), "stopped");
//! # }
//! ```

use std::sync::Arc;
use tokio::sync::watch;

/// Firing side of the shutdown signal. Owned by the engine.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Creates a handle in the not-shut-down state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Derives a token observing this handle.
    #[must_use]
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
            _anchor: None,
        }
    }

    /// Fires the signal. All derived tokens observe it; idempotent.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }

    /// Whether the signal has been fired.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Observing side of the shutdown signal. Cheap to clone; handed to every
/// worker and plugin.
///
/// If the owning [`ShutdownHandle`] is dropped without firing, tokens
/// treat that as cancellation — a vanished engine must not leave workers
/// waiting forever.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
    // Keeps a detached token's private sender alive.
    _anchor: Option<Arc<watch::Sender<bool>>>,
}

impl ShutdownToken {
    /// A token that never fires. For tests and for driving a plugin
    /// outside an engine.
    #[must_use]
    pub fn detached() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _anchor: Some(Arc::new(tx)),
        }
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested (immediately if it already
    /// was). Cancel-safe; usable inside `tokio::select!`.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // Err means the handle was dropped: treat as cancelled.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn token_observes_shutdown() {
        let handle = ShutdownHandle::new();
        let token = handle.token();
        assert!(!token.is_cancelled());

        handle.shutdown();
        assert!(token.is_cancelled());
        assert!(handle.is_shutdown());

        // Resolves immediately once fired.
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("cancelled() should resolve");
    }

    #[tokio::test]
    async fn clones_all_wake() {
        let handle = ShutdownHandle::new();
        let a = handle.token();
        let b = a.clone();

        handle.shutdown();
        a.cancelled().await;
        b.cancelled().await;
    }

    #[tokio::test]
    async fn dropped_handle_counts_as_cancelled() {
        let handle = ShutdownHandle::new();
        let token = handle.token();
        drop(handle);

        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("dropped handle should cancel tokens");
    }

    #[tokio::test]
    async fn detached_never_fires() {
        let token = ShutdownToken::detached();
        assert!(!token.is_cancelled());

        let result =
            tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(result.is_err(), "detached token must not fire");
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let handle = ShutdownHandle::new();
        let token = handle.token();
        handle.shutdown();
        handle.shutdown();
        assert!(token.is_cancelled());
    }
}
