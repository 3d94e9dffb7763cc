//! End-to-end: directory of documents through ingestion, the store and the
//! answering pipeline.

use super::{FakeLlm, MemorySink};
use crate::embeddings::providers::TrigramProvider;
use crate::ingest::ingest_directory;
use crate::parser::{DocumentExtractor, PdfExtractor};
use crate::query_log::QueryLogger;
use crate::rag::{RagPipeline, Synthesizer};
use crate::store::EmbeddingStore;
use explainer_core::{AppConfig, AppError, AppResult};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Reads files as plain UTF-8 text.
struct TextExtractor;

impl DocumentExtractor for TextExtractor {
    fn extract(&self, path: &Path) -> AppResult<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}

/// 600 words in four 150-word topic blocks.
fn synthetic_document() -> String {
    ["harvest orchard", "glacier telescope", "violin symphony", "volcano magma"]
        .iter()
        .map(|pair| vec![*pair; 75].join(" "))
        .collect::<Vec<_>>()
        .join(" ")
}

async fn indexed_store() -> (TempDir, Arc<EmbeddingStore>) {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("synthetic.pdf"), synthetic_document()).unwrap();

    let report = ingest_directory(temp.path(), &TextExtractor, 200, 50).unwrap();
    let store = EmbeddingStore::new(Arc::new(TrigramProvider::new(384)));
    store.add_chunks(report.chunks).await.unwrap();

    (temp, Arc::new(store))
}

fn pipeline(store: Arc<EmbeddingStore>, llm: Arc<FakeLlm>) -> RagPipeline {
    RagPipeline::new(store, Synthesizer::new(llm, "claude-sonnet-4-20250514").unwrap())
}

#[tokio::test]
async fn test_directory_to_ranked_chunk() {
    let (_temp, store) = indexed_store().await;

    let chunks = store.chunks();
    let ids: Vec<u32> = chunks.iter().map(|c| c.chunk_id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
    assert!(chunks.iter().all(|c| c.source == "synthetic.pdf"));
    assert!(chunks.iter().all(|c| c.text.split_whitespace().count() <= 200));

    let results = store.search("glacier telescope", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.chunk_id, 1);
}

#[tokio::test]
async fn test_persisted_store_answers_like_the_original() {
    let (temp, store) = indexed_store().await;
    let path = temp.path().join(".explainer").join("embedding_store.json");
    store.save(&path).unwrap();

    let reloaded = EmbeddingStore::new(Arc::new(TrigramProvider::new(384)));
    reloaded.load(&path).unwrap();

    assert_eq!(reloaded.chunks(), store.chunks());
    assert_eq!(
        reloaded.search("violin symphony", 2).await.unwrap(),
        store.search("violin symphony", 2).await.unwrap()
    );
}

#[tokio::test]
async fn test_ask_answers_and_logs() {
    let (_temp, store) = indexed_store().await;
    let llm = Arc::new(FakeLlm::replying("Glaciers are observed by telescope [Source 1]."));
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(store, llm.clone()).with_sink(sink.clone());

    let answer = pipeline.ask("glacier telescope", 2).await.unwrap();

    assert_eq!(answer.answer, "Glaciers are observed by telescope [Source 1].");
    assert_eq!(answer.retrieved_count, 2);
    assert_eq!(answer.sources[0].chunk_id, 1);
    assert_eq!(answer.tokens.unwrap().total, 1280);
    assert_eq!(llm.calls(), 1);

    let rows = sink.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].query, "glacier telescope");
    assert_eq!(rows[0].sources, answer.sources);
    assert_eq!((rows[0].input_tokens, rows[0].output_tokens), (1200, 80));
}

#[tokio::test]
async fn test_generation_failure_keeps_sources_and_skips_log() {
    let (_temp, store) = indexed_store().await;
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(store, Arc::new(FakeLlm::unreachable())).with_sink(sink.clone());

    let err = pipeline.ask("volcano magma", 3).await.unwrap_err();

    assert!(matches!(err.error, AppError::Generation(_)));
    assert_eq!(err.sources.len(), 3);
    assert_eq!(err.sources[0].chunk_id, 3);
    assert!(sink.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_no_results_skip_generation() {
    let (_temp, store) = indexed_store().await;
    let llm = Arc::new(FakeLlm::replying("unused"));
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(store, llm.clone()).with_sink(sink.clone());

    let answer = pipeline.ask("glacier", 0).await.unwrap();

    assert!(answer.is_empty_retrieval());
    assert!(answer.sources.is_empty());
    assert_eq!(llm.calls(), 0);
    assert!(sink.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_log_failure_does_not_fail_ask() {
    let (_temp, store) = indexed_store().await;
    let sink = Arc::new(MemorySink {
        fail: true,
        ..Default::default()
    });
    let pipeline = pipeline(store, Arc::new(FakeLlm::replying("An answer."))).with_sink(sink);

    let answer = pipeline.ask("harvest orchard", 1).await.unwrap();
    assert_eq!(answer.answer, "An answer.");
}

#[tokio::test(flavor = "current_thread")]
async fn test_log_write_runs_off_the_runtime_thread() {
    let (_temp, store) = indexed_store().await;
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(store, Arc::new(FakeLlm::replying("Answer."))).with_sink(sink.clone());

    pipeline.ask("glacier telescope", 1).await.unwrap();

    let rows = sink.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_ne!(rows[0].thread, std::thread::current().id());
}

#[tokio::test]
async fn test_query_logger_as_sink() {
    let (_temp, store) = indexed_store().await;
    let logger = Arc::new(QueryLogger::open_in_memory().unwrap());
    let pipeline = pipeline(store, Arc::new(FakeLlm::replying("Answer."))).with_sink(logger.clone());

    pipeline.ask("violin symphony", 2).await.unwrap();

    let stats = logger.stats().unwrap();
    assert_eq!(stats.total_queries, 1);
    assert_eq!(stats.total_tokens, 1280);

    let logged = logger.recent(1).unwrap();
    assert_eq!(logged[0].chunks_retrieved, 2);
    assert_eq!(logged[0].model, "claude-sonnet-4-20250514");
}

#[tokio::test]
async fn test_rejects_empty_query_and_unbuilt_store() {
    let (_temp, store) = indexed_store().await;
    let err = pipeline(store, Arc::new(FakeLlm::replying("x")))
        .ask("   ", 3)
        .await
        .unwrap_err();
    assert!(matches!(err.error, AppError::Config(_)));

    let empty = Arc::new(EmbeddingStore::new(Arc::new(TrigramProvider::new(384))));
    let err = pipeline(empty, Arc::new(FakeLlm::replying("x")))
        .ask("glacier", 3)
        .await
        .unwrap_err();
    assert!(matches!(err.error, AppError::NotIndexed));
    assert!(err.sources.is_empty());
}

fn workspace_config(temp: &TempDir) -> AppConfig {
    std::fs::create_dir_all(temp.path().join("data")).unwrap();
    AppConfig {
        workspace: temp.path().to_path_buf(),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_index_documents_persists_store() {
    let temp = TempDir::new().unwrap();
    let config = workspace_config(&temp);
    std::fs::write(temp.path().join("data/synthetic.pdf"), synthetic_document()).unwrap();

    let stats = crate::index_documents(&config, None, &TextExtractor).await.unwrap();
    assert_eq!(stats.documents_count, 1);
    assert_eq!(stats.chunks_count, 4);
    assert!(stats.failures.is_empty());

    let store = crate::open_store(&config).unwrap();
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn test_index_documents_keeps_store_when_every_document_fails() {
    let temp = TempDir::new().unwrap();
    let config = workspace_config(&temp);
    std::fs::write(temp.path().join("data/synthetic.pdf"), synthetic_document()).unwrap();
    crate::index_documents(&config, None, &TextExtractor).await.unwrap();
    let before = std::fs::read(config.store_path()).unwrap();

    // Plain text is not a PDF, so the real extractor rejects it
    let err = crate::index_documents(&config, None, &PdfExtractor::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Parse(_)));
    assert_eq!(std::fs::read(config.store_path()).unwrap(), before);
    assert_eq!(crate::open_store(&config).unwrap().len(), 4);
}
