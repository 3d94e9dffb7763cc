//! Answer synthesis: grounding prompt plus one LLM call.

use crate::rag::types::{SourceRef, Synthesis, TokenUsage};
use crate::types::SearchResult;
use explainer_core::{AppError, AppResult};
use explainer_llm::{LlmClient, LlmRequest};
use explainer_prompt::{build_prompt, builtin_prompt, PromptDefinition, RAG_ANSWER_PROMPT_ID};
use std::sync::Arc;
use std::time::Duration;

/// Default output cap for generated answers.
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Default generation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds grounded prompts and calls the model once per question.
pub struct Synthesizer {
    client: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    prompt: PromptDefinition,
}

impl Synthesizer {
    /// Create a synthesizer with the built-in grounding prompt.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> AppResult<Self> {
        let prompt = builtin_prompt(RAG_ANSWER_PROMPT_ID).ok_or_else(|| {
            AppError::Prompt(format!("Missing built-in prompt: {}", RAG_ANSWER_PROMPT_ID))
        })?;

        Ok(Self {
            client,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            prompt,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the grounding prompt (e.g. a workspace override).
    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate an answer grounded on `ranked`, best chunk first.
    ///
    /// Any failure of the model call, an empty answer, or exceeding the
    /// timeout is `AppError::Generation`. There is no retry.
    pub async fn synthesize(&self, query: &str, ranked: &[SearchResult]) -> AppResult<Synthesis> {
        let sources: Vec<SourceRef> = ranked.iter().map(SourceRef::from_result).collect();

        let built = build_prompt(
            &self.prompt,
            &serde_json::json!({
                "context": build_context(ranked),
                "query": query,
            }),
        )?;

        let mut request = LlmRequest::new(built.user, &self.model).with_max_tokens(self.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        tracing::info!(
            provider = self.client.provider_name(),
            model = %self.model,
            sources = ranked.len(),
            "Synthesizing answer"
        );

        let response = tokio::time::timeout(self.timeout, self.client.complete(&request))
            .await
            .map_err(|_| {
                AppError::Generation(format!(
                    "Generation timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| match e {
                AppError::Generation(_) => e,
                other => AppError::Generation(other.to_string()),
            })?;

        if response.content.trim().is_empty() {
            return Err(AppError::Generation(
                "Model returned an empty answer".to_string(),
            ));
        }

        let tokens = TokenUsage::from_llm(&response.usage);
        tracing::debug!("Generation finished, tokens: {:?}", tokens);

        Ok(Synthesis {
            answer: response.content,
            sources,
            tokens,
            model: response.model,
        })
    }
}

/// Render ranked chunks as numbered, attributed excerpts.
pub fn build_context(ranked: &[SearchResult]) -> String {
    ranked
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "[Source {}: {}, similarity={:.3}]\n{}\n",
                i + 1,
                result.chunk.source,
                result.similarity,
                result.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;
    use explainer_core::AppResult;
    use explainer_llm::{LlmResponse, LlmUsage};
    use std::sync::Mutex;

    /// Records the last request and replies with a fixed outcome.
    struct ScriptedLlm {
        reply: Result<String, String>,
        delay: Duration,
        last_request: Mutex<Option<LlmRequest>>,
    }

    impl ScriptedLlm {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                delay: Duration::ZERO,
                last_request: Mutex::new(None),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                delay: Duration::ZERO,
                last_request: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            tokio::time::sleep(self.delay).await;

            match &self.reply {
                Ok(text) => Ok(LlmResponse {
                    content: text.clone(),
                    model: request.model.clone(),
                    usage: LlmUsage::new(900, 100),
                    done: true,
                }),
                Err(message) => Err(AppError::Other(message.clone())),
            }
        }
    }

    fn ranked() -> Vec<SearchResult> {
        vec![
            SearchResult {
                chunk: Chunk::new("attention.pdf", 2, "Self-attention relates positions."),
                similarity: 0.8123,
            },
            SearchResult {
                chunk: Chunk::new("bert.pdf", 0, "Masked language modelling."),
                similarity: 0.5,
            },
        ]
    }

    #[test]
    fn test_build_context_format() {
        let context = build_context(&ranked());
        assert_eq!(
            context,
            "[Source 1: attention.pdf, similarity=0.812]\nSelf-attention relates positions.\n\n\
             [Source 2: bert.pdf, similarity=0.500]\nMasked language modelling.\n"
        );
    }

    #[tokio::test]
    async fn test_synthesize_grounds_prompt_and_returns_verbatim() {
        let llm = Arc::new(ScriptedLlm::replying("Attention relates tokens [Source 1]."));
        let synthesizer = Synthesizer::new(llm.clone(), "claude-sonnet-4-20250514").unwrap();

        let result = synthesizer.synthesize("What is attention?", &ranked()).await.unwrap();

        assert_eq!(result.answer, "Attention relates tokens [Source 1].");
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[0].source, "attention.pdf");
        assert_eq!(result.tokens.unwrap().total, 1000);
        assert_eq!(result.model, "claude-sonnet-4-20250514");

        let request = llm.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.max_tokens, Some(DEFAULT_MAX_TOKENS));
        let first = request.prompt.find("[Source 1: attention.pdf").unwrap();
        let second = request.prompt.find("[Source 2: bert.pdf").unwrap();
        let question = request.prompt.find("Question: What is attention?").unwrap();
        assert!(first < second && second < question);
    }

    #[tokio::test]
    async fn test_client_failure_is_generation_error() {
        let synthesizer = Synthesizer::new(Arc::new(ScriptedLlm::failing("connection refused")), "m").unwrap();
        let err = synthesizer.synthesize("q", &ranked()).await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_empty_answer_is_generation_error() {
        let synthesizer = Synthesizer::new(Arc::new(ScriptedLlm::replying("  \n")), "m").unwrap();
        let err = synthesizer.synthesize("q", &ranked()).await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_generation_error() {
        let llm = ScriptedLlm {
            delay: Duration::from_secs(5),
            ..ScriptedLlm::replying("too late")
        };
        let synthesizer = Synthesizer::new(Arc::new(llm), "m")
            .unwrap()
            .with_timeout(Duration::from_millis(50));

        let err = synthesizer.synthesize("q", &ranked()).await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
        assert!(err.to_string().contains("timed out"));
    }
}
