//! PDF text extraction and cleaning.

use explainer_core::{AppError, AppResult};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").expect("valid regex"));

static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("valid regex"));

// Word characters, whitespace and basic punctuation survive cleaning
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?;:()\-']").expect("valid regex"));

/// Extracts raw text from a document file.
///
/// Ingestion goes through this trait so the pipeline can be driven by
/// fixtures without real PDFs.
pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> AppResult<String>;
}

/// PDF extractor backed by `lopdf`, one text block per page.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentExtractor for PdfExtractor {
    /// Extract per-page text joined by newlines.
    ///
    /// Pages that fail to decode are skipped with a warning. The document
    /// fails with `Parse` when it cannot be loaded or no page decodes.
    fn extract(&self, path: &Path) -> AppResult<String> {
        let bytes = std::fs::read(path)?;

        let document = lopdf::Document::load_mem(&bytes)
            .map_err(|e| AppError::Parse(format!("Failed to parse PDF {:?}: {}", path, e)))?;

        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(AppError::Parse(format!("PDF {:?} has no pages", path)));
        }

        let mut texts = Vec::with_capacity(pages.len());
        let mut skipped = 0usize;

        for page_number in pages.keys() {
            match document.extract_text(&[*page_number]) {
                Ok(text) => texts.push(text),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Skipping page {} of {:?}: {}", page_number, path, e);
                }
            }
        }

        if texts.is_empty() {
            return Err(AppError::Parse(format!(
                "No page of {:?} could be decoded ({} pages)",
                path,
                pages.len()
            )));
        }

        tracing::debug!(
            "Extracted {} of {} pages from {:?} ({} skipped)",
            texts.len(),
            pages.len(),
            path,
            skipped
        );

        Ok(texts.join("\n"))
    }
}

/// Normalise extracted text.
///
/// Collapses newline runs and space runs, replaces characters outside
/// word characters, whitespace and `.,!?;:()-'` with a space, then trims.
pub fn clean(text: &str) -> String {
    let text = NEWLINE_RUNS.replace_all(text, "\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    let text = DISALLOWED.replace_all(&text, " ");
    text.trim().to_string()
}
