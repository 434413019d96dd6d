//! LLM-backed agent speaking the OpenAI chat-completions wire format.
//!
//! Queries are answered by POSTing to `{api_url}/chat/completions`. The
//! latest pipeline batch is kept as a read-only context snapshot and
//! summarized into the system prompt, so answers can reference what the
//! collectors are currently seeing. Works against any server exposing
//! the OpenAI wire format.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vigil_plugin::{
    Agent, Lifecycle, LlmConfig, Plugin, PluginParams, PluginRole, PluginStatus, ShutdownToken,
};
use vigil_types::{AgentResponse, DataPoint, ErrorKind, FrameworkError};

/// Outbound request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How many trailing samples the context summary mentions.
const CONTEXT_SAMPLES: usize = 10;

/// Confidence reported for successful completions.
const RESPONSE_CONFIDENCE: f64 = 0.8;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Default)]
struct LlmState {
    config: LlmConfig,
    client: Option<reqwest::Client>,
}

/// Agent plugin backed by an OpenAI-compatible chat API.
pub struct LlmAgent {
    name: String,
    lifecycle: Lifecycle,
    state: RwLock<LlmState>,
    context: RwLock<Vec<DataPoint>>,
}

impl LlmAgent {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lifecycle: Lifecycle::new(),
            state: RwLock::new(LlmState::default()),
            context: RwLock::new(Vec::new()),
        }
    }

    fn configured(&self) -> Result<(reqwest::Client, LlmConfig), FrameworkError> {
        let state = self.state.read();
        match &state.client {
            Some(client) => Ok((client.clone(), state.config.clone())),
            None => Err(FrameworkError::configuration(
                "agent",
                "query",
                format!("{} is not configured", self.name),
            )),
        }
    }

    /// One-line description of the latest context snapshot for the
    /// system prompt.
    fn context_summary(&self) -> String {
        let context = self.context.read();
        if context.is_empty() {
            return "No telemetry has been observed yet.".into();
        }
        let samples: Vec<String> = context
            .iter()
            .rev()
            .take(CONTEXT_SAMPLES)
            .map(|p| format!("{}={:.2}", p.metric, p.value))
            .collect();
        format!(
            "Latest telemetry ({} samples total): {}",
            context.len(),
            samples.join(", ")
        )
    }
}

#[async_trait]
impl Plugin for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> PluginRole {
        PluginRole::Agent
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn configure(&self, params: &PluginParams) -> Result<(), FrameworkError> {
        let PluginParams::Llm(config) = params else {
            return Err(FrameworkError::validation(
                "agent",
                "configure",
                format!("{}: expected llm configuration", self.name),
            ));
        };
        params.validate(&self.name)?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                FrameworkError::wrap(
                    e,
                    ErrorKind::Internal,
                    "agent",
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
        if let Err(e) = self.health().await {
            self.lifecycle.fail();
            return Err(FrameworkError::wrap(
                e,
                ErrorKind::Network,
                "agent",
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
        if config.api_key.is_empty() {
            return Err(FrameworkError::configuration(
                "agent",
                "health",
                format!("{}: no API key configured", self.name),
            ));
        }

        let url = format!("{}/models", config.api_url.trim_end_matches('/'));
        let response = client
            .get(url)
            .bearer_auth(&config.api_key)
            .send()
            .await
            .map_err(|e| {
                FrameworkError::wrap(
                    e,
                    ErrorKind::Network,
                    "agent",
                    "health",
                    format!("{}: API unreachable", self.name),
                )
            })?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(FrameworkError::network(
                "agent",
                "health",
                format!("{}: API returned status {}", self.name, response.status()),
            ))
        }
    }

    fn capabilities(&self) -> Vec<String> {
        vec![
            "natural_language_queries".into(),
            "telemetry_context".into(),
        ]
    }
}

#[async_trait]
impl Agent for LlmAgent {
    async fn process_query(&self, query: &str) -> Result<AgentResponse, FrameworkError> {
        let (client, config) = self.configured()?;

        let request = ChatRequest {
            model: &config.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: format!(
                        "You are an observability assistant for a telemetry pipeline. {}",
                        self.context_summary()
                    ),
                },
                ChatMessage {
                    role: "user".into(),
                    content: query.to_string(),
                },
            ],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let url = format!("{}/chat/completions", config.api_url.trim_end_matches('/'));
        let response = client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                FrameworkError::wrap(
                    e,
                    ErrorKind::Network,
                    "agent",
                    "query",
                    format!("{}: completion request failed", self.name),
                )
            })?;
        if !response.status().is_success() {
            return Err(FrameworkError::network(
                "agent",
                "query",
                format!("{}: API returned status {}", self.name, response.status()),
            ));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            FrameworkError::wrap(
                e,
                ErrorKind::Network,
                "agent",
                "query",
                format!("{}: malformed completion payload", self.name),
            )
        })?;
        let answer = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                FrameworkError::network(
                    "agent",
                    "query",
                    format!("{}: completion carried no choices", self.name),
                )
            })?;

        Ok(AgentResponse::new(query, answer, RESPONSE_CONFIDENCE)
            .with_metadata("model", serde_json::json!(config.model)))
    }

    fn set_context(&self, batch: &[DataPoint]) {
        *self.context.write() = batch.to_vec();
    }

    fn available_queries(&self) -> Vec<String> {
        vec![
            "What is the current system status?".into(),
            "Are there any anomalies in the telemetry?".into(),
            "Which metric changed most recently?".into(),
        ]
    }
}
