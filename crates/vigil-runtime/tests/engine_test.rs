//! End-to-end engine tests driving the full pipeline with test doubles.

use std::sync::Arc;
use std::time::Duration;
use vigil_plugin::testing::{EchoAgent, FlagAnalyzer, RecordingResponder, ScriptedCollector};
use vigil_plugin::{Plugin, PluginHandle};
use vigil_runtime::{CheckState, Engine, FrameworkConfig};
use vigil_types::{DataPoint, FrameworkError};

fn point(value: f64) -> DataPoint {
    DataPoint::new("test", "cpu", value)
}

fn config_on_port(port: u16) -> FrameworkConfig {
    FrameworkConfig {
        server_host: "127.0.0.1".into(),
        server_port: port,
        shutdown_timeout: 5,
        ..FrameworkConfig::default()
    }
}

/// Polls `cond` every 10 ms until it holds or the deadline passes.
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

#[tokio::test]
async fn pipeline_flows_collector_to_responder() {
    let engine = Engine::new(config_on_port(19201)).unwrap();

    let collector = Arc::new(ScriptedCollector::new(
        "c",
        Duration::from_millis(20),
        vec![vec![point(1.0)], vec![point(2.0)], vec![point(3.0)]],
    ));
    let analyzer = Arc::new(FlagAnalyzer::new("a"));
    let responder = Arc::new(RecordingResponder::new("r"));
    let agent = Arc::new(EchoAgent::new("ai"));

    engine.load_plugin(PluginHandle::Collector(collector)).unwrap();
    engine.load_plugin(PluginHandle::Analyzer(analyzer)).unwrap();
    engine
        .load_plugin(PluginHandle::Responder(responder.clone()))
        .unwrap();
    engine.load_plugin(PluginHandle::Agent(agent.clone())).unwrap();

    engine.start().await.unwrap();

    let delivered = wait_until(Duration::from_secs(5), || responder.recorded().len() >= 3).await;
    assert!(delivered, "responder saw {} analyses", responder.recorded().len());

    // Batches from one collector arrive in production order.
    let recorded = responder.recorded();
    let first_values: Vec<f64> = recorded[..3]
        .iter()
        .map(|analysis| analysis.data_points[0].value)
        .collect();
    assert_eq!(first_values, vec![1.0, 2.0, 3.0]);

    // Every analysis surfaced to responders is well formed and sourced.
    for analysis in &recorded {
        assert!(analysis.is_well_formed());
        assert_eq!(analysis.source, "a");
    }

    // The agent's context snapshot tracked the batches.
    assert!(agent.context_updates() >= 3);
    assert!(!agent.context().is_empty());

    let metrics = engine.metrics();
    assert!(metrics.batches_processed >= 3);
    assert!(metrics.analyses_produced >= 3);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn channel_capacity_one_still_progresses() {
    let config = FrameworkConfig {
        data_channel_size: 1,
        ..config_on_port(19202)
    };
    let engine = Engine::new(config).unwrap();

    let collector = Arc::new(ScriptedCollector::repeating(
        "c",
        Duration::from_millis(5),
        vec![point(1.0)],
    ));
    let analyzer = Arc::new(FlagAnalyzer::new("a"));
    let responder = Arc::new(RecordingResponder::new("r"));
    engine.load_plugin(PluginHandle::Collector(collector)).unwrap();
    engine.load_plugin(PluginHandle::Analyzer(analyzer)).unwrap();
    engine
        .load_plugin(PluginHandle::Responder(responder.clone()))
        .unwrap();

    engine.start().await.unwrap();
    let progressed = wait_until(Duration::from_secs(5), || responder.recorded().len() >= 3).await;
    assert!(progressed, "pipeline stalled with capacity 1");
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn graceful_shutdown_under_load() {
    let config = FrameworkConfig {
        data_channel_size: 4,
        ..config_on_port(19203)
    };
    let engine = Engine::new(config).unwrap();

    let collector = Arc::new(ScriptedCollector::repeating(
        "c",
        Duration::from_millis(1),
        vec![point(1.0)],
    ));
    let analyzer = Arc::new(FlagAnalyzer::new("a"));
    let responder = Arc::new(RecordingResponder::new("r"));
    engine.load_plugin(PluginHandle::Collector(collector)).unwrap();
    engine.load_plugin(PluginHandle::Analyzer(analyzer)).unwrap();
    engine.load_plugin(PluginHandle::Responder(responder)).unwrap();

    engine.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stop_started = tokio::time::Instant::now();
    engine.stop().await.unwrap();
    assert!(
        stop_started.elapsed() < Duration::from_secs(5),
        "stop exceeded shutdown timeout"
    );

    let status = engine.status();
    assert!(!status.running);
    for entry in status.plugins.values() {
        assert!(matches!(
            entry.status,
            vigil_plugin::PluginStatus::Stopped | vigil_plugin::PluginStatus::Error
        ));
    }
}

#[tokio::test]
async fn slow_analyzer_does_not_crash_collector() {
    let config = FrameworkConfig {
        data_channel_size: 4,
        ..config_on_port(19204)
    };
    let engine = Engine::new(config).unwrap();

    let collector = Arc::new(ScriptedCollector::repeating(
        "c",
        Duration::from_millis(1),
        vec![point(1.0)],
    ));
    let analyzer = Arc::new(FlagAnalyzer::new("a").with_delay(Duration::from_millis(30)));
    let responder = Arc::new(RecordingResponder::new("r"));
    engine
        .load_plugin(PluginHandle::Collector(collector.clone()))
        .unwrap();
    engine.load_plugin(PluginHandle::Analyzer(analyzer)).unwrap();
    engine
        .load_plugin(PluginHandle::Responder(responder.clone()))
        .unwrap();

    engine.start().await.unwrap();
    let responded = wait_until(Duration::from_secs(5), || !responder.recorded().is_empty()).await;
    assert!(responded, "slow analyzer never produced a response");
    assert!(collector.collect_calls() > 0);
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn collect_failures_are_tolerated() {
    let engine = Engine::new(config_on_port(19205)).unwrap();

    let collector = Arc::new(ScriptedCollector::with_results(
        "c",
        Duration::from_millis(5),
        vec![
            Err("scrape failed".into()),
            Ok(vec![point(1.0)]),
            Err("scrape failed again".into()),
            Ok(vec![point(2.0)]),
        ],
    ));
    let analyzer = Arc::new(FlagAnalyzer::new("a"));
    let responder = Arc::new(RecordingResponder::new("r"));
    engine.load_plugin(PluginHandle::Collector(collector)).unwrap();
    engine.load_plugin(PluginHandle::Analyzer(analyzer)).unwrap();
    engine
        .load_plugin(PluginHandle::Responder(responder.clone()))
        .unwrap();

    engine.start().await.unwrap();
    let recovered = wait_until(Duration::from_secs(5), || responder.recorded().len() >= 2).await;
    assert!(recovered, "pipeline did not survive collect failures");
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn failing_check_degrades_health_but_not_liveness() {
    let engine = Engine::new(config_on_port(19206)).unwrap();
    engine
        .load_plugin(PluginHandle::Agent(Arc::new(EchoAgent::new("ai"))))
        .unwrap();
    engine.health_checker().register_check("always_fails", || {
        Box::pin(async { Err(FrameworkError::internal("test", "check", "doomed")) })
    });

    engine.start().await.unwrap();
    // Give the listener a beat to come up.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = reqwest::Client::new();
    let response = client
        .get("http://127.0.0.1:19206/health")
        .send()
        .await
        .expect("health endpoint reachable");
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");

    let health = engine.health().await;
    assert_eq!(health.state, CheckState::Unhealthy);
    assert_eq!(health.checks["always_fails"].state, CheckState::Unhealthy);
    assert_eq!(health.checks["engine_running"].state, CheckState::Healthy);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn http_surface_reports_ready_metrics_and_status() {
    let engine = Engine::new(config_on_port(19207)).unwrap();
    engine
        .load_plugin(PluginHandle::Agent(Arc::new(EchoAgent::new("ai"))))
        .unwrap();

    engine.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = reqwest::Client::new();
    let base = "http://127.0.0.1:19207";

    let ready = client.get(format!("{base}/ready")).send().await.unwrap();
    assert_eq!(ready.status(), 200);
    assert_eq!(ready.text().await.unwrap(), "Ready");

    let metrics = client.get(format!("{base}/metrics")).send().await.unwrap();
    let body = metrics.text().await.unwrap();
    assert!(body.contains("framework_running 1"));
    assert!(body.contains("framework_agents 1"));

    let status: serde_json::Value = client
        .get(format!("{base}/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["running"], serde_json::json!(true));
    assert_eq!(status["agents"], serde_json::json!(1));
    assert_eq!(status["plugins"]["ai"]["status"], serde_json::json!("running"));

    engine.stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // After stop the endpoint is gone (connection refused) -- the
    // surface shuts down with the engine.
    assert!(client.get(format!("{base}/health")).send().await.is_err());
}

#[tokio::test]
async fn start_then_immediate_stop_completes_quickly() {
    let engine = Engine::new(config_on_port(19208)).unwrap();
    engine
        .load_plugin(PluginHandle::Collector(Arc::new(ScriptedCollector::new(
            "c",
            Duration::from_secs(60),
            vec![],
        ))))
        .unwrap();

    let begun = tokio::time::Instant::now();
    engine.start().await.unwrap();
    engine.stop().await.unwrap();
    assert!(begun.elapsed() < Duration::from_secs(6));
}

#[tokio::test]
async fn zero_interval_collector_uses_default_and_stays_quiet() {
    let engine = Engine::new(config_on_port(19209)).unwrap();

    // A zero collection interval is driven at the 30 s default, so no
    // batch can arrive within this test's window.
    let collector = Arc::new(ScriptedCollector::repeating(
        "c",
        Duration::ZERO,
        vec![point(1.0)],
    ));
    let analyzer = Arc::new(FlagAnalyzer::new("a"));
    let responder = Arc::new(RecordingResponder::new("r"));
    engine
        .load_plugin(PluginHandle::Collector(collector.clone()))
        .unwrap();
    engine.load_plugin(PluginHandle::Analyzer(analyzer)).unwrap();
    engine
        .load_plugin(PluginHandle::Responder(responder.clone()))
        .unwrap();

    engine.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(collector.collect_calls(), 0);
    assert!(responder.recorded().is_empty());
    engine.stop().await.unwrap();
}

#[tokio::test]
async fn unload_mid_run_keeps_engine_consistent() {
    let engine = Engine::new(config_on_port(19210)).unwrap();

    let collector = Arc::new(ScriptedCollector::repeating(
        "c",
        Duration::from_millis(5),
        vec![point(1.0)],
    ));
    let analyzer = Arc::new(FlagAnalyzer::new("a"));
    let responder = Arc::new(RecordingResponder::new("r"));
    engine.load_plugin(PluginHandle::Collector(collector)).unwrap();
    engine
        .load_plugin(PluginHandle::Analyzer(analyzer.clone()))
        .unwrap();
    engine
        .load_plugin(PluginHandle::Responder(responder.clone()))
        .unwrap();

    engine.start().await.unwrap();
    let flowing = wait_until(Duration::from_secs(5), || !responder.recorded().is_empty()).await;
    assert!(flowing);

    // Unregister the analyzer while batches are in flight: the plugin is
    // stopped and removed, and the engine keeps running.
    engine.unload_plugin("a").await.unwrap();
    assert_eq!(analyzer.status(), vigil_plugin::PluginStatus::Stopped);
    assert!(engine.status().running);
    assert_eq!(engine.status().analyzers, 0);

    engine.stop().await.unwrap();
}
