//! LLM provider factory.
//!
//! Builds the configured LLM client, injecting secrets and the generation
//! timeout.

use crate::client::LlmClient;
use crate::providers::{ClaudeClient, OllamaClient};
use crate::types::ProviderType;
use explainer_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("claude", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required for Claude)
/// * `api_version` - Optional `anthropic-version` header override (Claude only)
/// * `timeout` - Per-request timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    api_version: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    tracing::debug!(provider = provider_type.as_str(), "Creating LLM client");

    match provider_type {
        ProviderType::Claude => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("Claude provider requires API key".to_string())
            })?;
            let mut client = ClaudeClient::new(api_key, endpoint, timeout)?;
            if let Some(version) = api_version {
                client = client.with_api_version(version);
            }
            Ok(Arc::new(client))
        }
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::new(endpoint, timeout)?)),
    }
}
