//! HTTP health surface.
//!
//! An embedded axum server bound to `{server_host}:{server_port}`,
//! started by [`Engine::start`](crate::Engine::start) and drained with a
//! 5-second grace as part of stop. No authorization: these endpoints are
//! meant for orchestrator probes.
//!
//! | Endpoint | Body | 200 when |
//! |----------|------|----------|
//! | `GET /health` | `OK` | running and not shutting down |
//! | `GET /ready` | `Ready` | live and at least one plugin registered |
//! | `GET /metrics` | text exposition | always |
//! | `GET /status` | JSON snapshot | always |
//!
//! Liveness is about the engine, not the plugins: a plugin stuck in
//! `error` shows up in `/status` and the health checks, never in
//! `/health`.

use crate::engine::state::{snapshot, EngineState, MetricsSnapshot, PipelineMetrics};
use crate::engine::EngineStatus;
use crate::PluginRegistry;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use vigil_plugin::ShutdownToken;
use vigil_types::{ErrorKind, FrameworkError};

/// Grace given to in-flight connections after shutdown fires.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Shared state behind the health endpoints.
#[derive(Clone)]
pub(crate) struct HttpState {
    state: Arc<EngineState>,
    registry: Arc<PluginRegistry>,
    metrics: Arc<PipelineMetrics>,
}

impl HttpState {
    pub(crate) fn new(
        state: Arc<EngineState>,
        registry: Arc<PluginRegistry>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            state,
            registry,
            metrics,
        }
    }
}

/// Builds the health-surface router.
pub(crate) fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .route("/status", get(status))
        .with_state(state)
}

async fn health(State(ctx): State<HttpState>) -> (StatusCode, &'static str) {
    if ctx.state.is_live() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
    }
}

async fn ready(State(ctx): State<HttpState>) -> (StatusCode, &'static str) {
    if ctx.state.is_live() && ctx.registry.count() > 0 {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
    }
}

async fn metrics(
    State(ctx): State<HttpState>,
) -> ([(header::HeaderName, &'static str); 1], String) {
    let status = snapshot(&ctx.state, &ctx.registry);
    let body = render_metrics(&status, &ctx.metrics.snapshot());
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

async fn status(State(ctx): State<HttpState>) -> Json<EngineStatus> {
    Json(snapshot(&ctx.state, &ctx.registry))
}

/// Prometheus-style text exposition of the engine gauges and counters.
fn render_metrics(status: &EngineStatus, metrics: &MetricsSnapshot) -> String {
    let mut out = String::with_capacity(512);
    out.push_str("# Vigil framework metrics\n");
    out.push_str(&format!(
        "framework_running {}\n",
        u8::from(status.running)
    ));
    out.push_str(&format!(
        "framework_total_plugins {}\n",
        status.total_plugins
    ));
    out.push_str(&format!("framework_collectors {}\n", status.collectors));
    out.push_str(&format!("framework_analyzers {}\n", status.analyzers));
    out.push_str(&format!("framework_responders {}\n", status.responders));
    out.push_str(&format!("framework_agents {}\n", status.agents));
    out.push_str(&format!(
        "framework_batches_processed {}\n",
        metrics.batches_processed
    ));
    out.push_str(&format!(
        "framework_analyses_produced {}\n",
        metrics.analyses_produced
    ));
    out.push_str(&format!(
        "framework_analyses_dropped {}\n",
        metrics.analyses_dropped
    ));
    out
}

/// Binds and serves the health surface until shutdown.
///
/// A bind failure is a network-kind error; it is logged and the worker
/// exits, leaving the engine running without a health surface (matching
/// the propagation policy for individual component failures at start).
pub(crate) async fn serve(addr: String, state: HttpState, shutdown: ShutdownToken) {
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            let err = FrameworkError::wrap(
                e,
                ErrorKind::Network,
                "http",
                "bind",
                format!("failed to bind health surface to {addr}"),
            );
            error!(error = %err, "health surface unavailable");
            return;
        }
    };
    info!(%addr, "health surface listening");

    let signal = shutdown.clone();
    let server = axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            if let Err(e) = result {
                error!(error = %e, "health surface error");
            }
        }
        () = async {
            shutdown.cancelled().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } => {
            warn!(
                grace_secs = SHUTDOWN_GRACE.as_secs(),
                "health surface did not drain within grace period"
            );
        }
    }
}
