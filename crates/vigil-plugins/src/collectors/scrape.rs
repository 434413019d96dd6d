//! HTTP metrics-scraping collector.
//!
//! Evaluates a configured list of queries against a Prometheus-style
//! query API (`{endpoint}/api/v1/query?query=…`) and converts each
//! result row into a [`DataPoint`]. Rows whose value cannot be read as a
//! number fall back to the placeholder value `1.0`; converting native
//! scrape results faithfully is a concern of richer collectors.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use vigil_plugin::{
    Collector, Lifecycle, Plugin, PluginParams, PluginRole, PluginStatus, ScrapeConfig,
    ShutdownToken,
};
use vigil_types::{DataPoint, ErrorKind, FrameworkError};

/// Value recorded when a query result carries no parsable number.
const PLACEHOLDER_VALUE: f64 = 1.0;

/// Transport- and payload-level scrape failures, wrapped into
/// [`FrameworkError`] at the plugin boundary.
#[derive(Debug, Error)]
enum ScrapeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("query endpoint returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected payload: {0}")]
    Payload(String),
}

#[derive(Default)]
struct ScrapeState {
    config: ScrapeConfig,
    client: Option<reqwest::Client>,
}

/// Periodic HTTP collector for numeric query results.
pub struct ScrapeCollector {
    name: String,
    lifecycle: Lifecycle,
    state: RwLock<ScrapeState>,
}

impl ScrapeCollector {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lifecycle: Lifecycle::new(),
            state: RwLock::new(ScrapeState::default()),
        }
    }

    fn configured(&self) -> Result<(reqwest::Client, ScrapeConfig), FrameworkError> {
        let state = self.state.read();
        match &state.client {
            Some(client) => Ok((client.clone(), state.config.clone())),
            None => Err(FrameworkError::configuration(
                "collector",
                "collect",
                format!("{} is not configured", self.name),
            )),
        }
    }

    async fn evaluate(
        &self,
        client: &reqwest::Client,
        config: &ScrapeConfig,
        query: &str,
    ) -> Result<Vec<DataPoint>, ScrapeError> {
        let url = format!("{}/api/v1/query", config.endpoint.trim_end_matches('/'));
        let response = client.get(url).query(&[("query", query)]).send().await?;
        if !response.status().is_success() {
            return Err(ScrapeError::Status(response.status()));
        }

        let body: serde_json::Value = response.json().await?;
        let rows = body["data"]["result"]
            .as_array()
            .ok_or_else(|| ScrapeError::Payload("missing data.result array".into()))?;

        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let labels: std::collections::HashMap<String, String> = row["metric"]
                .as_object()
                .map(|metric| {
                    metric
                        .iter()
                        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                        .collect()
                })
                .unwrap_or_default();

            let metric = labels
                .get("__name__")
                .cloned()
                .unwrap_or_else(|| query.to_string());

            // Instant-vector rows carry [timestamp, "value"].
            let value = row["value"]
                .get(1)
                .and_then(|v| v.as_str())
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(PLACEHOLDER_VALUE);

            let mut point = DataPoint::new(&self.name, metric, value);
            point.labels = labels;
            points.push(point);
        }
        Ok(points)
    }
}

#[async_trait]
impl Plugin for ScrapeCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> PluginRole {
        PluginRole::Collector
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn configure(&self, params: &PluginParams) -> Result<(), FrameworkError> {
        let PluginParams::Scrape(config) = params else {
            return Err(FrameworkError::validation(
                "collector",
                "configure",
                format!("{}: expected scrape configuration", self.name),
            ));
        };
        params.validate(&self.name)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| {
                FrameworkError::wrap(
                    e,
                    ErrorKind::Internal,
                    "collector",
                    "configure",
                    format!("{}: failed to build HTTP client", self.name),
                )
            })?;

        let mut state = self.state.write();
        state.config = config.clone();
        state.client = Some(client);
        Ok(())
    }

    async fn start(&self, _shutdown: ShutdownToken) -> Result<(), FrameworkError> {
        self.lifecycle.begin_start(&self.name)?;
        // Verify connectivity before joining the pipeline.
        if let Err(e) = self.health().await {
            self.lifecycle.fail();
            return Err(FrameworkError::wrap(
                e,
                ErrorKind::Network,
                "collector",
                "start",
                format!("{}: health check failed", self.name),
            ));
        }
        self.lifecycle.complete_start();
        Ok(())
    }

    async fn stop(&self) -> Result<(), FrameworkError> {
        self.lifecycle.begin_stop(&self.name)?;
        self.lifecycle.complete_stop();
        Ok(())
    }

    fn status(&self) -> PluginStatus {
        self.lifecycle.status()
    }

    async fn health(&self) -> Result<(), FrameworkError> {
        let (client, config) = self.configured()?;
        let url = format!("{}/-/healthy", config.endpoint.trim_end_matches('/'));
        let response = client.get(url).send().await.map_err(|e| {
            FrameworkError::wrap(
                e,
                ErrorKind::Network,
                "collector",
                "health",
                format!("{}: endpoint unreachable", self.name),
            )
        })?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(FrameworkError::network(
                "collector",
                "health",
                format!(
                    "{}: endpoint returned status {}",
                    self.name,
                    response.status()
                ),
            ))
        }
    }

    fn capabilities(&self) -> Vec<String> {
        vec![
            "metrics_collection".into(),
            "http_scraping".into(),
            "query_evaluation".into(),
        ]
    }
}

#[async_trait]
impl Collector for ScrapeCollector {
    async fn collect(&self) -> Result<Vec<DataPoint>, FrameworkError> {
        let (client, config) = self.configured()?;

        let mut points = Vec::new();
        let mut last_error = None;
        for query in &config.queries {
            match self.evaluate(&client, &config, query).await {
                Ok(mut batch) => points.append(&mut batch),
                Err(e) => {
                    warn!(collector = %self.name, query = %query, error = %e, "query failed");
                    last_error = Some(e);
                }
            }
        }

        // Partial results are better than none; fail only when every
        // query failed.
        if points.is_empty() {
            if let Some(e) = last_error {
                return Err(FrameworkError::wrap(
                    e,
                    ErrorKind::Network,
                    "collector",
                    "collect",
                    format!("{}: all queries failed", self.name),
                ));
            }
        }
        Ok(points)
    }

    fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.state.read().config.scrape_interval)
    }
}
