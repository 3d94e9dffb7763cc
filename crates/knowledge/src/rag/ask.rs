//! RAG answering orchestration.
//!
//! Retrieves relevant chunks from the shared store and generates a grounded
//! answer through the synthesizer.

use crate::rag::synthesize::Synthesizer;
use crate::rag::types::{AskError, RagAnswer, SourceRef};
use crate::store::EmbeddingStore;
use explainer_core::{AppError, AppResult};
use std::sync::Arc;

/// Destination for successfully answered queries.
pub trait QuerySink: Send + Sync {
    /// Record one answered query; returns the new row id.
    fn log_query(
        &self,
        query: &str,
        answer: &str,
        sources: &[SourceRef],
        input_tokens: u32,
        output_tokens: u32,
        model: &str,
    ) -> AppResult<i64>;
}

/// Ties retrieval, generation and logging together.
///
/// Holds no per-call state; the store is the only long-lived shared part.
pub struct RagPipeline {
    store: Arc<EmbeddingStore>,
    synthesizer: Synthesizer,
    sink: Option<Arc<dyn QuerySink>>,
}

impl RagPipeline {
    pub fn new(store: Arc<EmbeddingStore>, synthesizer: Synthesizer) -> Self {
        Self {
            store,
            synthesizer,
            sink: None,
        }
    }

    /// Log every successful answer to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn QuerySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn store(&self) -> &Arc<EmbeddingStore> {
        &self.store
    }

    /// Answer `query` from the `top_k` most similar chunks.
    ///
    /// No retrieved chunk yields a "no information" answer without calling
    /// the model. When generation fails the retrieved sources ride along in
    /// the returned [`AskError`].
    pub async fn ask(&self, query: &str, top_k: usize) -> Result<RagAnswer, AskError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Config("Query must not be empty".to_string()).into());
        }

        tracing::info!(top_k, "Answering query: {}", query);

        let results = self.store.search(query, top_k).await?;
        if results.is_empty() {
            tracing::info!("No chunks retrieved, skipping generation");
            return Ok(RagAnswer::no_information(query));
        }

        tracing::debug!(
            "Retrieved {} chunks, best similarity {:.3}",
            results.len(),
            results[0].similarity
        );

        let synthesis = match self.synthesizer.synthesize(query, &results).await {
            Ok(synthesis) => synthesis,
            Err(error) => {
                let sources = results.iter().map(SourceRef::from_result).collect();
                return Err(AskError::new(error, sources));
            }
        };

        let answer = RagAnswer {
            query: query.to_string(),
            answer: synthesis.answer,
            sources: synthesis.sources,
            retrieved_count: results.len(),
            tokens: synthesis.tokens,
            model: synthesis.model,
        };

        self.record(&answer).await;

        Ok(answer)
    }

    /// Write `answer` to the sink on the blocking pool; finishes before `ask`
    /// returns.
    async fn record(&self, answer: &RagAnswer) {
        let Some(sink) = self.sink.clone() else {
            return;
        };

        let logged = answer.clone();
        let written = tokio::task::spawn_blocking(move || {
            let (input, output) = logged
                .tokens
                .map(|t| (t.input, t.output))
                .unwrap_or((0, 0));

            sink.log_query(
                &logged.query,
                &logged.answer,
                &logged.sources,
                input,
                output,
                &logged.model,
            )
        })
        .await;

        match written {
            Ok(Ok(id)) => tracing::debug!("Logged query as row {}", id),
            Ok(Err(e)) => tracing::warn!("Failed to log query: {}", e),
            Err(e) => tracing::warn!("Query log task failed: {}", e),
        }
    }
}
