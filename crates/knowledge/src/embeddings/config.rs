//! Embedding configuration.

use explainer_core::config::EmbeddingSettings;
use serde::{Deserialize, Serialize};

/// Default Ollama endpoint for embeddings.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Embedding configuration resolved from the `embedding:` settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Endpoint for HTTP providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Per-request timeout for HTTP providers
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    /// Build from application settings.
    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            endpoint: settings.endpoint.clone(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Endpoint for HTTP providers, falling back to the local Ollama URL.
    pub fn endpoint_or_default(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }
}
