//! Anthropic Claude provider implementation.
//!
//! Uses the Messages API: https://docs.anthropic.com/en/api/messages

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use explainer_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Anthropic API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Default `anthropic-version` header value.
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Used when the request does not set `max_tokens`, which the API requires.
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Claude LLM client.
pub struct ClaudeClient {
    /// Base URL for the Anthropic API
    base_url: String,

    /// API key sent as `x-api-key`
    api_key: String,

    /// Value of the `anthropic-version` header
    api_version: String,

    /// Request timeout
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl ClaudeClient {
    /// Create a new Claude client.
    ///
    /// `base_url` defaults to the public Anthropic endpoint.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout,
            client,
        })
    }

    /// Override the `anthropic-version` header.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Convert LlmRequest to the Messages API format.
    fn to_messages_request(&self, request: &LlmRequest) -> MessagesRequest {
        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![Message {
                role: "user",
                content: request.prompt.clone(),
            }],
            system: request.system.clone(),
        }
    }

    /// Convert a Messages API response to LlmResponse.
    fn convert_response(&self, response: MessagesResponse) -> AppResult<LlmResponse> {
        let content: String = response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if content.trim().is_empty() {
            return Err(AppError::Generation(
                "Claude returned an empty response".to_string(),
            ));
        }

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response.model,
            usage,
            done: response.stop_reason.as_deref() != Some("max_tokens"),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for ClaudeClient {
    fn provider_name(&self) -> &str {
        "claude"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request to Claude");
        tracing::debug!("Prompt length: {} chars", request.prompt.len());

        let body = self.to_messages_request(request);
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Generation(format!(
                        "Claude request timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    AppError::Generation(format!("Failed to send request to Claude: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Generation(format!(
                "Claude API error ({}): {}",
                status, error_text
            )));
        }

        let messages_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse Claude response: {}", e)))?;

        let converted = self.convert_response(messages_response)?;

        tracing::info!(
            input_tokens = converted.usage.prompt_tokens,
            output_tokens = converted.usage.completion_tokens,
            "Received completion from Claude"
        );

        Ok(converted)
    }
}
