//! Agent plugins.

mod llm;

pub use llm::LlmAgent;
