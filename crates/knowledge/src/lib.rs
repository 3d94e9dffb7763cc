//! Document question answering over a local PDF corpus.
//!
//! PDFs are extracted, cleaned and cut into overlapping word windows,
//! embedded into an in-memory store persisted as JSON, and queried
//! through a retrieval-augmented generation pipeline.

pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod parser;
pub mod query_log;
pub mod rag;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use parser::{DocumentExtractor, PdfExtractor};
pub use query_log::{LoggedQuery, QueryLogger, QueryStats};
pub use rag::{AskError, QuerySink, RagAnswer, RagPipeline, SourceRef, Synthesizer};
pub use session::{Admission, RateLimiter, Session};
pub use store::EmbeddingStore;
pub use types::{Chunk, IndexStats, IngestReport, SearchResult};

use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
use explainer_core::{AppConfig, AppError, AppResult};
use explainer_prompt::{resolve_prompt, RAG_ANSWER_PROMPT_ID};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Embedding provider described by the `embedding:` settings.
pub fn embedding_provider(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    create_provider(&EmbeddingConfig::from_settings(&config.embedding))
}

/// Build the store from every PDF in `dir` (default: the configured
/// documents directory) and persist it to the configured store path.
///
/// Documents that fail to decode are reported in the stats, not raised.
/// When every document failed, nothing is written and the existing store
/// is kept.
pub async fn index_documents(
    config: &AppConfig,
    dir: Option<&Path>,
    extractor: &dyn DocumentExtractor,
) -> AppResult<IndexStats> {
    let start = Instant::now();
    config.validate_rag()?;

    let dir = match dir {
        Some(dir) => config.resolve_path(dir),
        None => config.documents_dir(),
    };

    tracing::info!("Indexing documents from {:?}", dir);

    let report = ingest::ingest_directory(
        &dir,
        extractor,
        config.rag.chunk_size as usize,
        config.rag.chunk_overlap as usize,
    )?;

    let documents_count = report.documents_processed();
    let chunks_count = report.chunks.len();

    if chunks_count == 0 && !report.failures.is_empty() {
        for failure in &report.failures {
            tracing::warn!("Failed to index {}: {}", failure.source, failure.error);
        }
        return Err(AppError::Parse(format!(
            "None of the {} documents in {:?} could be indexed; existing store left unchanged",
            report.failures.len(),
            dir
        )));
    }

    let store = EmbeddingStore::new(embedding_provider(config)?);
    store.add_chunks(report.chunks).await?;

    config.ensure_explainer_dir()?;
    store.save(&config.store_path())?;

    let duration = start.elapsed();
    tracing::info!(
        "Index built: {} documents, {} chunks in {:.2}s",
        documents_count,
        chunks_count,
        duration.as_secs_f64()
    );

    Ok(IndexStats {
        documents_count,
        chunks_count,
        failures: report.failures,
        duration_secs: duration.as_secs_f64(),
    })
}

/// Load the persisted store. A missing store file is `NotIndexed`.
pub fn open_store(config: &AppConfig) -> AppResult<Arc<EmbeddingStore>> {
    let path = config.store_path();
    if !path.exists() {
        return Err(AppError::NotIndexed);
    }

    let store = EmbeddingStore::new(embedding_provider(config)?);
    store.load(&path)?;

    tracing::debug!("Loaded {} chunks from {:?}", store.len(), path);
    Ok(Arc::new(store))
}

/// Synthesizer for the configured provider, model and limits.
///
/// A workspace prompt override at `.explainer/prompts/rag.answer.yml` replaces
/// the built-in grounding prompt.
pub fn synthesizer(config: &AppConfig) -> AppResult<Synthesizer> {
    let provider = config.provider.as_str();
    let timeout = Duration::from_secs(config.resolve_timeout(provider));
    let api_key = config.resolve_api_key(provider);
    let endpoint = config.resolve_endpoint(provider);
    let api_version = config.resolve_api_version(provider);

    let client = explainer_llm::create_client(
        provider,
        endpoint.as_deref(),
        api_key.as_deref(),
        api_version.as_deref(),
        timeout,
    )?;

    let prompt = resolve_prompt(&config.workspace, RAG_ANSWER_PROMPT_ID)?;

    Ok(Synthesizer::new(client, &config.model)?
        .with_max_tokens(config.rag.max_tokens)
        .with_timeout(timeout)
        .with_prompt(prompt))
}

/// Full pipeline over `store`, logging to the configured query log unless
/// `log_queries` is false.
pub fn pipeline(
    config: &AppConfig,
    store: Arc<EmbeddingStore>,
    log_queries: bool,
) -> AppResult<RagPipeline> {
    let pipeline = RagPipeline::new(store, synthesizer(config)?);
    if !log_queries {
        return Ok(pipeline);
    }

    config.ensure_explainer_dir()?;
    let logger = QueryLogger::open(&config.log_db_path())?;
    Ok(pipeline.with_sink(Arc::new(logger)))
}
