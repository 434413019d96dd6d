//! Pipeline workers: per-collector drivers and the single processor.
//!
//! # Collector worker
//!
//! One task per collector. On each tick it invokes the collector and
//! pushes any non-empty batch onto the bounded channel. A full channel
//! blocks the send until a slot opens or shutdown fires; on shutdown the
//! in-flight batch is dropped and the worker exits. Collect failures are
//! logged and the worker continues.
//!
//! # Processor worker
//!
//! Exactly one. For each batch it (a) updates every running agent's
//! context snapshot, (b) offers the batch to every running analyzer that
//! declares it can handle it, and (c) dispatches each resulting analysis
//! to every running responder that accepts it. Analyzer and responder
//! failures are logged and processing continues.
//!
//! Batches from one collector arrive in production order (each collector
//! has its own sender); ordering across collectors is unspecified.

use super::state::PipelineMetrics;
use crate::PluginRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use vigil_plugin::{Agent, Analyzer, Collector, Plugin, Responder, ShutdownToken};
use vigil_types::DataPoint;

/// Interval used when a collector reports a zero collection interval.
pub(crate) const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(30);

/// A collector's effective driving interval.
pub(crate) fn effective_interval(interval: Duration) -> Duration {
    if interval.is_zero() {
        DEFAULT_COLLECTION_INTERVAL
    } else {
        interval
    }
}

/// Drives one collector until shutdown.
pub(crate) async fn collector_worker(
    collector: Arc<dyn Collector>,
    tx: mpsc::Sender<Vec<DataPoint>>,
    shutdown: ShutdownToken,
) {
    let interval = effective_interval(collector.collection_interval());
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(collector = collector.name(), "collector worker stopping");
                return;
            }
            _ = ticker.tick() => {}
        }

        let batch = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(collector = collector.name(), "collector worker stopping mid-collect");
                return;
            }
            result = collector.collect() => match result {
                Ok(batch) => batch,
                Err(e) => {
                    error!(collector = collector.name(), error = %e, "collect failed");
                    continue;
                }
            }
        };

        if batch.is_empty() {
            continue;
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(collector = collector.name(), "dropping batch on shutdown");
                return;
            }
            sent = tx.send(batch) => {
                if sent.is_err() {
                    // Receiver gone: the processor has already exited.
                    return;
                }
            }
        }
    }
}

/// Consumes the channel until shutdown or closure.
pub(crate) async fn processor(
    registry: Arc<PluginRegistry>,
    mut rx: mpsc::Receiver<Vec<DataPoint>>,
    shutdown: ShutdownToken,
    metrics: Arc<PipelineMetrics>,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("processor stopping on shutdown");
                return;
            }
            received = rx.recv() => match received {
                None => {
                    debug!("processor stopping, channel closed");
                    return;
                }
                Some(batch) => process_batch(&registry, &batch, &metrics).await,
            }
        }
    }
}

/// Fans one batch through agents, analyzers, and responders.
///
/// Only plugins currently in `running` status are observed.
pub(crate) async fn process_batch(
    registry: &PluginRegistry,
    batch: &[DataPoint],
    metrics: &PipelineMetrics,
) {
    for agent in registry.agents() {
        if agent.status().is_running() {
            agent.set_context(batch);
        }
    }

    for analyzer in registry.analyzers() {
        if !analyzer.status().is_running() || !analyzer.can_analyze(batch) {
            continue;
        }

        let analysis = match analyzer.analyze(batch) {
            Ok(Some(analysis)) => analysis,
            Ok(None) => continue,
            Err(e) => {
                error!(analyzer = analyzer.name(), error = %e, "analysis failed");
                continue;
            }
        };

        if !analysis.is_well_formed() {
            warn!(
                analyzer = analyzer.name(),
                confidence = analysis.confidence,
                data_points = analysis.data_points.len(),
                "discarding malformed analysis"
            );
            continue;
        }
        metrics.record_analysis();

        let mut handled = false;
        for responder in registry.responders() {
            if !responder.status().is_running() || !responder.can_handle(&analysis) {
                continue;
            }
            handled = true;
            if let Err(e) = responder.respond(&analysis).await {
                error!(responder = responder.name(), error = %e, "respond failed");
            }
        }
        if !handled {
            metrics.record_dropped();
            debug!(analyzer = analyzer.name(), "no responder accepted analysis");
        }
    }

    metrics.record_batch();
}
