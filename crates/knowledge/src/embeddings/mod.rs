//! Embedding providers.
//!
//! Provider-agnostic embedding generation; the store embeds chunks and
//! queries through one `EmbeddingProvider`.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
