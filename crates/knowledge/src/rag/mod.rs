//! RAG (Retrieval-Augmented Generation) answering.
//!
//! Grounded answers over the indexed documents using LLM synthesis.

pub mod ask;
pub mod synthesize;
pub mod types;

pub use ask::{QuerySink, RagPipeline};
pub use synthesize::{build_context, Synthesizer};
pub use types::{AskError, RagAnswer, SourceRef, Synthesis, TokenUsage};
