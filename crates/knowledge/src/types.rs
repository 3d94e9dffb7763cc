//! Core types for the document corpus.

use serde::{Deserialize, Serialize};

/// A contiguous word window of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Document file name (e.g., "attention.pdf")
    pub source: String,

    /// 0-based position of the window within its document
    pub chunk_id: u32,

    /// Window text, words joined by single spaces
    pub text: String,
}

impl Chunk {
    pub fn new(source: impl Into<String>, chunk_id: u32, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            chunk_id,
            text: text.into(),
        }
    }
}

/// A chunk paired with its cosine similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,

    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

/// Per-document outcome of directory ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// Document file name
    pub source: String,

    /// Chunks produced from the document
    pub chunks: usize,
}

/// A document that could not be ingested.
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    /// Document file name
    pub source: String,

    /// Rendered error
    pub error: String,
}

/// Result of ingesting a directory of PDFs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// All chunks, documents in file-name order
    pub chunks: Vec<Chunk>,

    /// Documents that were read successfully
    pub documents: Vec<DocumentSummary>,

    /// Documents that were skipped
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn documents_processed(&self) -> usize {
        self.documents.len()
    }
}

/// Statistics for an index build.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    /// Documents that produced text
    pub documents_count: usize,

    /// Chunks embedded and stored
    pub chunks_count: usize,

    /// Documents that were skipped
    pub failures: Vec<IngestFailure>,

    /// Time taken in seconds
    pub duration_secs: f64,
}
