//! Plugin role tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four plugin roles in the pipeline.
///
/// Collectors produce telemetry, analyzers inspect it, responders act on
/// analysis results, and agents answer interactive queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginRole {
    Collector,
    Analyzer,
    Responder,
    Agent,
}

impl PluginRole {
    /// All roles, in pipeline order.
    pub const ALL: [PluginRole; 4] = [
        PluginRole::Collector,
        PluginRole::Analyzer,
        PluginRole::Responder,
        PluginRole::Agent,
    ];
}

impl fmt::Display for PluginRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collector => "collector",
            Self::Analyzer => "analyzer",
            Self::Responder => "responder",
            Self::Agent => "agent",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lowercase() {
        assert_eq!(PluginRole::Collector.to_string(), "collector");
        assert_eq!(PluginRole::Agent.to_string(), "agent");
    }

    #[test]
    fn serde_matches_display() {
        for role in PluginRole::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
        }
    }
}
