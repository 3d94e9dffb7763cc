//! Directory ingestion: PDFs to cleaned, chunked text.

use crate::chunker;
use crate::parser::{self, DocumentExtractor};
use crate::types::{DocumentSummary, IngestFailure, IngestReport};
use explainer_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List the `.pdf` files directly inside `dir`, sorted by file name.
pub fn list_pdfs(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Documents directory not found: {}", dir.display()),
        )));
    }

    let mut pdfs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| AppError::Io(std::io::Error::other(e.to_string())))?;
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

        if entry.file_type().is_file() && is_pdf {
            pdfs.push(path.to_path_buf());
        }
    }

    Ok(pdfs)
}

/// Extract, clean and chunk every PDF in `dir`.
///
/// A document that fails to read or decode is recorded in
/// `IngestReport::failures` and ingestion moves on. Bad chunking
/// parameters fail the whole call.
pub fn ingest_directory(
    dir: &Path,
    extractor: &dyn DocumentExtractor,
    chunk_size: usize,
    overlap: usize,
) -> AppResult<IngestReport> {
    chunker::validate_params(chunk_size, overlap)?;

    let pdfs = list_pdfs(dir)?;
    tracing::info!("Found {} PDF files in {:?}", pdfs.len(), dir);

    let mut report = IngestReport::default();

    for path in pdfs {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let text = match extractor.extract(&path) {
            Ok(raw) => parser::clean(&raw),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", source, e);
                report.failures.push(IngestFailure {
                    source,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let chunks = chunker::chunk_document(&source, &text, chunk_size, overlap)?;
        if chunks.is_empty() {
            tracing::warn!("{} produced no chunks ({} characters of text)", source, text.len());
        } else {
            tracing::debug!("{}: {} chunks", source, chunks.len());
        }

        report.documents.push(DocumentSummary {
            source,
            chunks: chunks.len(),
        });
        report.chunks.extend(chunks);
    }

    tracing::info!(
        "Ingested {} documents into {} chunks ({} failed)",
        report.documents.len(),
        report.chunks.len(),
        report.failures.len()
    );

    Ok(report)
}
