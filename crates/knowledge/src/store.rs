//! In-memory embedding store with brute-force cosine search.
//!
//! Chunks and their vectors live in an immutable snapshot behind a
//! reader-writer lock. Mutations build a new snapshot and swap it in, so a
//! concurrent search sees either the old or the new corpus, never a mix.

use crate::embeddings::EmbeddingProvider;
use crate::types::{Chunk, SearchResult};
use explainer_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Version written into persisted stores.
pub const STORE_FORMAT_VERSION: u32 = 1;

#[derive(Debug)]
struct Snapshot {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
}

/// On-disk representation of the store.
#[derive(Debug, Serialize, Deserialize)]
struct StoreBlob {
    version: u32,
    embedding_model: String,
    dimensions: usize,
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
}

/// Owns the chunk corpus and its embedding matrix.
#[derive(Debug)]
pub struct EmbeddingStore {
    provider: Arc<dyn EmbeddingProvider>,
    state: RwLock<Option<Arc<Snapshot>>>,
}

impl EmbeddingStore {
    /// Create an empty, not-yet-indexed store.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            state: RwLock::new(None),
        }
    }

    /// Embedding model used for chunks and queries.
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Vector width.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Whether `add_chunks` or `load` has run.
    pub fn is_indexed(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Number of stored chunks (0 when not indexed).
    pub fn len(&self) -> usize {
        self.snapshot().map(|s| s.chunks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the stored chunks in insertion order.
    pub fn chunks(&self) -> Vec<Chunk> {
        self.snapshot()
            .map(|s| s.chunks.clone())
            .unwrap_or_default()
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        // A poisoned lock still holds a complete snapshot
        let guard = self.state.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    fn swap(&self, snapshot: Snapshot) {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Arc::new(snapshot));
    }

    /// Replace the store contents with `chunks`, embedding each chunk's text.
    ///
    /// On error the previous contents stay in place.
    pub async fn add_chunks(&self, chunks: Vec<Chunk>) -> AppResult<()> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            tracing::info!(
                "Embedding {} chunks with {} ({})",
                texts.len(),
                self.provider.provider_name(),
                self.provider.model_name()
            );
            self.provider.embed_batch(&texts).await?
        };

        if embeddings.len() != chunks.len() {
            return Err(AppError::Embedding(format!(
                "Provider returned {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = self.dimensions();
        if let Some(row) = embeddings.iter().position(|e| e.len() != dimensions) {
            return Err(AppError::Embedding(format!(
                "Embedding {} has {} dimensions, expected {}",
                row,
                embeddings[row].len(),
                dimensions
            )));
        }

        self.swap(Snapshot { chunks, embeddings });
        tracing::debug!("Store now holds {} chunks", self.len());

        Ok(())
    }

    /// Return the `top_k` chunks most similar to `query`, best first.
    ///
    /// Ties keep insertion order. `top_k = 0` and an empty corpus give an
    /// empty result; searching before any `add_chunks`/`load` is
    /// `NotIndexed`.
    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<SearchResult>> {
        let snapshot = self.snapshot().ok_or(AppError::NotIndexed)?;

        if top_k == 0 || snapshot.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.provider.embed(query).await?;

        Ok(rank(&snapshot, &query_embedding, top_k))
    }

    /// Persist the store as one JSON document.
    ///
    /// Writes a sibling temp file and renames it over `path`.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let snapshot = self.snapshot().ok_or(AppError::NotIndexed)?;

        let blob = StoreBlob {
            version: STORE_FORMAT_VERSION,
            embedding_model: self.model_name().to_string(),
            dimensions: self.dimensions(),
            chunks: snapshot.chunks.clone(),
            embeddings: snapshot.embeddings.clone(),
        };

        let json = serde_json::to_vec(&blob)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "store".to_string());
        let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;

        tracing::info!("Saved {} chunks to {:?}", blob.chunks.len(), path);
        Ok(())
    }

    /// Replace the store contents with a persisted store.
    ///
    /// `Io` when the file cannot be read, `Corruption` when it does not
    /// have the expected shape, `Config` when it was built with a different
    /// embedding model or width.
    pub fn load(&self, path: &Path) -> AppResult<()> {
        let bytes = std::fs::read(path)?;

        let blob: StoreBlob = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Corruption(format!("{:?}: {}", path, e)))?;

        validate_blob(&blob)?;

        if blob.embedding_model != self.model_name() || blob.dimensions != self.dimensions() {
            return Err(AppError::Config(format!(
                "Store {:?} was built with {} ({} dims) but the configured embedding model is {} ({} dims). Run 'explainer index' again.",
                path,
                blob.embedding_model,
                blob.dimensions,
                self.model_name(),
                self.dimensions()
            )));
        }

        let count = blob.chunks.len();
        self.swap(Snapshot {
            chunks: blob.chunks,
            embeddings: blob.embeddings,
        });

        tracing::info!("Loaded {} chunks from {:?}", count, path);
        Ok(())
    }
}

fn validate_blob(blob: &StoreBlob) -> AppResult<()> {
    if blob.version != STORE_FORMAT_VERSION {
        return Err(AppError::Corruption(format!(
            "unsupported store version {}",
            blob.version
        )));
    }

    if blob.chunks.len() != blob.embeddings.len() {
        return Err(AppError::Corruption(format!(
            "{} chunks but {} embedding rows",
            blob.chunks.len(),
            blob.embeddings.len()
        )));
    }

    if let Some(row) = blob.embeddings.iter().position(|e| e.len() != blob.dimensions) {
        return Err(AppError::Corruption(format!(
            "embedding row {} has {} values, declared dimension is {}",
            row,
            blob.embeddings[row].len(),
            blob.dimensions
        )));
    }

    Ok(())
}

fn rank(snapshot: &Snapshot, query: &[f32], top_k: usize) -> Vec<SearchResult> {
    let mut scored: Vec<(usize, f32)> = snapshot
        .embeddings
        .iter()
        .enumerate()
        .map(|(i, embedding)| (i, cosine_similarity(query, embedding)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(i, similarity)| SearchResult {
            chunk: snapshot.chunks[i].clone(),
            similarity,
        })
        .collect()
}

/// Cosine similarity; 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use tempfile::TempDir;

    fn store() -> EmbeddingStore {
        EmbeddingStore::new(Arc::new(TrigramProvider::new(384)))
    }

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("a.pdf", 0, "gradient descent optimizer learning rate"),
            Chunk::new("a.pdf", 1, "convolutional kernels detect image edges"),
            Chunk::new("b.pdf", 0, "recurrent networks process token sequences"),
        ]
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_before_indexing_is_not_indexed() {
        let store = store();
        assert!(!store.is_indexed());
        assert!(matches!(
            store.search("anything", 3).await,
            Err(AppError::NotIndexed)
        ));
    }

    #[tokio::test]
    async fn test_empty_corpus_searches_empty() {
        let store = store();
        store.add_chunks(Vec::new()).await.unwrap();

        assert!(store.is_indexed());
        assert!(store.search("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_top_k_bounds() {
        let store = store();
        store.add_chunks(sample_chunks()).await.unwrap();

        assert!(store.search("gradient", 0).await.unwrap().is_empty());

        let all = store.search("gradient descent", 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].chunk.chunk_id, 0);
        assert_eq!(all[0].chunk.source, "a.pdf");
        for pair in all.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[tokio::test]
    async fn test_add_chunks_replaces_contents() {
        let store = store();
        store.add_chunks(sample_chunks()).await.unwrap();
        store
            .add_chunks(vec![Chunk::new("c.pdf", 0, "only chunk left")])
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.chunks()[0].source, "c.pdf");
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = store();
        store
            .add_chunks(vec![
                Chunk::new("x.pdf", 0, "identical words here"),
                Chunk::new("y.pdf", 0, "identical words here"),
                Chunk::new("z.pdf", 0, "identical words here"),
            ])
            .await
            .unwrap();

        let results = store.search("identical words", 3).await.unwrap();
        let sources: Vec<&str> = results.iter().map(|r| r.chunk.source.as_str()).collect();
        assert_eq!(sources, vec!["x.pdf", "y.pdf", "z.pdf"]);
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/store.json");

        let original = store();
        original.add_chunks(sample_chunks()).await.unwrap();
        original.save(&path).unwrap();

        let restored = store();
        restored.load(&path).unwrap();

        assert_eq!(restored.chunks(), original.chunks());

        let before = original.snapshot().unwrap();
        let after = restored.snapshot().unwrap();
        for (a, b) in before.embeddings.iter().zip(after.embeddings.iter()) {
            for (x, y) in a.iter().zip(b.iter()) {
                assert!((x - y).abs() < 1e-6);
            }
        }

        let q1 = original.search("recurrent token", 3).await.unwrap();
        let q2 = restored.search("recurrent token", 3).await.unwrap();
        assert_eq!(q1, q2);
    }

    #[tokio::test]
    async fn test_save_before_indexing_fails() {
        let temp = TempDir::new().unwrap();
        let result = store().save(&temp.path().join("store.json"));
        assert!(matches!(result, Err(AppError::NotIndexed)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = store().load(&temp.path().join("absent.json"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_load_rejects_malformed_blobs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        let store = store();

        let cases = [
            "not json at all".to_string(),
            serde_json::json!({
                "version": 1, "embedding_model": "trigram-v1", "dimensions": 2,
                "chunks": [{"source": "a.pdf", "chunk_id": 0, "text": "t"}],
                "embeddings": []
            })
            .to_string(),
            serde_json::json!({
                "version": 1, "embedding_model": "trigram-v1", "dimensions": 2,
                "chunks": [
                    {"source": "a.pdf", "chunk_id": 0, "text": "t"},
                    {"source": "a.pdf", "chunk_id": 1, "text": "u"}
                ],
                "embeddings": [[0.1, 0.2], [0.3]]
            })
            .to_string(),
            serde_json::json!({
                "version": 7, "embedding_model": "trigram-v1", "dimensions": 2,
                "chunks": [], "embeddings": []
            })
            .to_string(),
        ];

        for case in cases {
            std::fs::write(&path, case).unwrap();
            assert!(matches!(store.load(&path), Err(AppError::Corruption(_))));
        }

        assert!(!store.is_indexed());
    }

    #[test]
    fn test_load_rejects_other_embedding_model() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "version": 1, "embedding_model": "all-minilm", "dimensions": 64,
                "chunks": [], "embeddings": []
            })
            .to_string(),
        )
        .unwrap();

        assert!(matches!(store().load(&path), Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_concurrent_searches_share_snapshot() {
        let store = Arc::new(store());
        store.add_chunks(sample_chunks()).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.search("image edges", 1).await })
            })
            .collect();

        for handle in handles {
            let results = handle.await.unwrap().unwrap();
            assert_eq!(results[0].chunk.text, "convolutional kernels detect image edges");
        }
    }
}
