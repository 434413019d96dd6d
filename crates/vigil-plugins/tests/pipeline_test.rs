//! End-to-end pipeline test with the real statistical analyzer.

use std::sync::Arc;
use std::time::Duration;
use vigil_plugin::testing::{RecordingResponder, ScriptedCollector};
use vigil_plugin::{Plugin, PluginHandle, PluginParams, StatisticalConfig};
use vigil_plugins::StatisticalAnalyzer;
use vigil_runtime::{Engine, FrameworkConfig};
use vigil_types::{AnalysisKind, DataPoint, Severity};

fn cpu(value: f64) -> DataPoint {
    DataPoint::new("collector", "cpu", value)
}

async fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Five nominal windows produce nothing; the sixth window carrying an
/// outlier produces exactly one anomaly at medium-or-higher severity.
#[tokio::test]
async fn anomaly_pipeline_flags_the_outlier_once() {
    let config = FrameworkConfig {
        server_host: "127.0.0.1".into(),
        server_port: 19301,
        shutdown_timeout: 5,
        ..FrameworkConfig::default()
    };
    let engine = Engine::new(config).unwrap();

    // Five steady windows, then the same window plus one spike.
    let nominal = vec![cpu(50.0); 5];
    let mut spiked = nominal.clone();
    spiked.push(cpu(200.0));
    let script = vec![
        nominal.clone(),
        nominal.clone(),
        nominal.clone(),
        nominal.clone(),
        nominal,
        spiked,
    ];
    let collector = Arc::new(ScriptedCollector::new(
        "collector",
        Duration::from_millis(10),
        script,
    ));

    let analyzer = Arc::new(StatisticalAnalyzer::new("detector"));
    analyzer
        .configure(&PluginParams::Statistical(StatisticalConfig {
            threshold: 2.0,
            ..StatisticalConfig::default()
        }))
        .unwrap();

    let responder = Arc::new(RecordingResponder::new("logger"));

    engine
        .load_plugin(PluginHandle::Collector(collector.clone()))
        .unwrap();
    engine.load_plugin(PluginHandle::Analyzer(analyzer)).unwrap();
    engine
        .load_plugin(PluginHandle::Responder(responder.clone()))
        .unwrap();

    engine.start().await.unwrap();

    let flagged = wait_until(Duration::from_secs(5), || !responder.recorded().is_empty()).await;
    assert!(flagged, "outlier was never flagged");

    // Let remaining ticks drain to prove nothing else fires.
    wait_until(Duration::from_secs(2), || collector.collect_calls() >= 8).await;

    let recorded = responder.recorded();
    assert_eq!(recorded.len(), 1, "expected exactly one anomaly");
    let analysis = &recorded[0];
    assert_eq!(analysis.kind, AnalysisKind::Anomaly);
    assert_eq!(analysis.data_points.len(), 1);
    assert_eq!(analysis.data_points[0].value, 200.0);
    assert!(analysis.severity >= Severity::Medium);
    assert_eq!(analysis.source, "detector");

    let metrics = engine.metrics();
    assert_eq!(metrics.analyses_produced, 1);
    assert!(metrics.batches_processed >= 6);

    engine.stop().await.unwrap();
}
