//! LLM integration crate for Explainer.
//!
//! This crate provides a provider-agnostic abstraction for the answer
//! synthesis call. Every provider implements [`LlmClient`], so the RAG
//! pipeline can be tested against a fake client.
//!
//! # Providers
//! - **Claude**: Anthropic Messages API (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use explainer_llm::{LlmClient, LlmRequest, providers::ClaudeClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClaudeClient::new("sk-ant-...", None, Duration::from_secs(60))?;
//! let request = LlmRequest::new("What is attention?", "claude-sonnet-4-20250514")
//!     .with_max_tokens(1500);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{ClaudeClient, OllamaClient};
pub use types::ProviderType;
