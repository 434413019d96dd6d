//! Agent query responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of an agent query.
///
/// Returned synchronously from the query path; `query` echoes the input
/// text so responses remain self-describing when logged or forwarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// The query text, echoed back.
    pub query: String,
    /// Free-form response text.
    pub response: String,
    /// Agent's confidence in the response, `0.0` to `1.0`.
    pub confidence: f64,
    /// Suggested follow-up actions, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<AgentAction>,
    /// Agent-specific metadata (model name, token counts, …).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
}

impl AgentResponse {
    /// Creates a response timestamped now with no actions or metadata.
    #[must_use]
    pub fn new(query: impl Into<String>, response: impl Into<String>, confidence: f64) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            confidence,
            actions: Vec::new(),
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Appends a suggested action.
    #[must_use]
    pub fn with_action(mut self, action: AgentAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// An action an agent suggests in response to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    /// Action type tag (e.g. `"restart_service"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable description.
    pub description: String,
    /// Action parameters.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, serde_json::Value>,
}

impl AgentAction {
    /// Creates an action with empty parameters.
    #[must_use]
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            parameters: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_response() {
        let response = AgentResponse::new("status?", "all good", 0.9);
        assert_eq!(response.query, "status?");
        assert_eq!(response.response, "all good");
        assert!(response.actions.is_empty());
    }

    #[test]
    fn action_builder() {
        let response = AgentResponse::new("q", "r", 0.5)
            .with_action(AgentAction::new("restart_service", "restart the web tier"))
            .with_metadata("model", serde_json::json!("gpt-4"));
        assert_eq!(response.actions.len(), 1);
        assert_eq!(response.actions[0].kind, "restart_service");
        assert_eq!(response.metadata["model"], serde_json::json!("gpt-4"));
    }

    #[test]
    fn action_kind_serializes_as_type() {
        let action = AgentAction::new("scale_up", "add a replica");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "scale_up");
    }

    #[test]
    fn serde_roundtrip() {
        let response = AgentResponse::new("q", "r", 1.0)
            .with_action(AgentAction::new("noop", "nothing"));
        let json = serde_json::to_string(&response).unwrap();
        let back: AgentResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response, back);
    }
}
