//! RAG response types.

use crate::types::SearchResult;
use explainer_core::AppError;
use explainer_llm::LlmUsage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Characters of chunk text kept in a source preview.
pub const PREVIEW_CHARS: usize = 200;

/// A retrieved chunk as shown to the user and stored in the query log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Document file name
    pub source: String,

    /// Chunk position within the document
    pub chunk_id: u32,

    /// Cosine similarity to the query
    pub similarity: f32,

    /// First `PREVIEW_CHARS` characters of the chunk, "..." appended when cut
    pub text_preview: String,
}

impl SourceRef {
    pub fn from_result(result: &SearchResult) -> Self {
        Self {
            source: result.chunk.source.clone(),
            chunk_id: result.chunk.chunk_id,
            similarity: result.similarity,
            text_preview: preview(&result.chunk.text),
        }
    }
}

/// Truncate text to `PREVIEW_CHARS` characters on a char boundary.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Token counts reported by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
    pub total: u32,
}

impl TokenUsage {
    /// `None` when the provider reported nothing.
    pub fn from_llm(usage: &LlmUsage) -> Option<Self> {
        if usage.total_tokens == 0 {
            return None;
        }

        Some(Self {
            input: usage.prompt_tokens,
            output: usage.completion_tokens,
            total: usage.total_tokens,
        })
    }
}

/// Output of one synthesis call.
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Generated text, verbatim
    pub answer: String,

    /// Ranked sources the prompt was grounded on
    pub sources: Vec<SourceRef>,

    pub tokens: Option<TokenUsage>,

    /// Model that produced the answer
    pub model: String,
}

/// Answer to a question with the evidence it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub query: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub retrieved_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenUsage>,

    /// Model that produced the answer; empty when no model was called
    #[serde(default)]
    pub model: String,
}

impl RagAnswer {
    /// Answer for a query that retrieved nothing. No model is called.
    pub fn no_information(query: &str) -> Self {
        Self {
            query: query.to_string(),
            answer: format!(
                "I could not find information about \"{}\" in the indexed documents.",
                query
            ),
            sources: Vec::new(),
            retrieved_count: 0,
            tokens: None,
            model: String::new(),
        }
    }

    /// Whether the answer was produced without any retrieved source.
    pub fn is_empty_retrieval(&self) -> bool {
        self.retrieved_count == 0
    }
}

/// A failed `ask`, carrying whatever sources were retrieved before the failure.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct AskError {
    #[source]
    pub error: AppError,
    pub sources: Vec<SourceRef>,
}

impl AskError {
    pub fn new(error: AppError, sources: Vec<SourceRef>) -> Self {
        Self { error, sources }
    }
}

impl From<AppError> for AskError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            sources: Vec::new(),
        }
    }
}
