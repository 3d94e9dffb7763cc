//! Crate-level scenario tests and their shared fakes.

mod pipeline;

use crate::embeddings::EmbeddingProvider;
use crate::rag::{QuerySink, SourceRef};
use explainer_core::{AppError, AppResult};
use explainer_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Embeds text as normalised counts of a fixed keyword list, one axis per keyword.
#[derive(Debug)]
pub(crate) struct KeywordProvider {
    keywords: Vec<&'static str>,
}

impl KeywordProvider {
    pub(crate) fn new(keywords: &[&'static str]) -> Self {
        Self {
            keywords: keywords.to_vec(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn provider_name(&self) -> &str {
        "keyword"
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dimensions(&self) -> usize {
        self.keywords.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut v: Vec<f32> = self
                    .keywords
                    .iter()
                    .map(|k| lower.split_whitespace().filter(|w| w == k).count() as f32)
                    .collect();
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    v.iter_mut().for_each(|x| *x /= norm);
                }
                v
            })
            .collect())
    }
}

/// LLM stand-in with a canned reply or failure; counts calls.
pub(crate) struct FakeLlm {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl FakeLlm {
    pub(crate) fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.reply {
            Some(text) => Ok(LlmResponse {
                content: text.clone(),
                model: request.model.clone(),
                usage: LlmUsage::new(1200, 80),
                done: true,
            }),
            None => Err(AppError::Generation(
                "Failed to connect to Claude API: connection refused".to_string(),
            )),
        }
    }
}

/// Row recorded by [`MemorySink`].
#[derive(Debug, Clone)]
pub(crate) struct SinkRow {
    pub query: String,
    pub sources: Vec<SourceRef>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub thread: std::thread::ThreadId,
}

/// Query sink that keeps rows in memory, optionally failing every write.
#[derive(Default)]
pub(crate) struct MemorySink {
    pub rows: Mutex<Vec<SinkRow>>,
    pub fail: bool,
}

impl QuerySink for MemorySink {
    fn log_query(
        &self,
        query: &str,
        _answer: &str,
        sources: &[SourceRef],
        input_tokens: u32,
        output_tokens: u32,
        _model: &str,
    ) -> AppResult<i64> {
        if self.fail {
            return Err(AppError::Database("disk full".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        rows.push(SinkRow {
            query: query.to_string(),
            sources: sources.to_vec(),
            input_tokens,
            output_tokens,
            thread: std::thread::current().id(),
        });
        Ok(rows.len() as i64)
    }
}
