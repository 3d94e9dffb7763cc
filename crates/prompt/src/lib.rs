//! Prompt system for Explainer.
//!
//! This crate provides structured prompt management with:
//! - A built-in grounding prompt for answer synthesis
//! - YAML prompt definitions that override it per workspace
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, load_prompt, resolve_prompt, RAG_ANSWER_PROMPT_ID};
pub use types::{BuiltPrompt, PromptDefinition};
