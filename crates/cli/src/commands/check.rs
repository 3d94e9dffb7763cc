//! Check command handler.
//!
//! Exercises extraction, embedding and retrieval against the local setup
//! without calling the language model.

use clap::Args;
use explainer_core::{config::AppConfig, AppError, AppResult};
use explainer_knowledge::embeddings::EmbeddingProvider;
use explainer_knowledge::store::cosine_similarity;
use explainer_knowledge::{chunker, ingest, parser, DocumentExtractor, PdfExtractor};

const SAMPLE_QUERY: &str = "What are embeddings?";

/// Verify the setup without calling the language model
#[derive(Args, Debug)]
pub struct CheckCommand {}

/// Tally of passed and failed checks.
#[derive(Default)]
struct Report {
    failed: usize,
}

impl Report {
    fn pass(&self, message: impl AsRef<str>) {
        println!("   ✓ {}", message.as_ref());
    }

    fn fail(&mut self, message: impl AsRef<str>) {
        self.failed += 1;
        println!("   ✗ {}", message.as_ref());
    }
}

impl CheckCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing check command");

        let mut report = Report::default();

        println!("1. Configuration...");
        match config.validate_rag() {
            Ok(()) => report.pass(format!(
                "Chunking {} words with {} overlap, top {} results",
                config.rag.chunk_size, config.rag.chunk_overlap, config.rag.top_k
            )),
            Err(e) => report.fail(e.to_string()),
        }

        println!("\n2. Documents...");
        check_documents(config, &mut report);

        println!("\n3. Embedding model...");
        match explainer_knowledge::embedding_provider(config) {
            Ok(provider) => check_embeddings(provider.as_ref(), &mut report).await,
            Err(e) => report.fail(e.to_string()),
        }

        println!("\n4. Embedding store...");
        check_store(config, &mut report).await;

        println!("\n5. Language model credentials...");
        check_credentials(config, &mut report);

        println!();
        if report.failed > 0 {
            return Err(AppError::Other(format!(
                "{} setup check(s) failed",
                report.failed
            )));
        }

        println!("All checks passed.");
        Ok(())
    }
}

fn check_documents(config: &AppConfig, report: &mut Report) {
    let dir = config.documents_dir();
    let pdfs = match ingest::list_pdfs(&dir) {
        Ok(pdfs) => pdfs,
        Err(e) => {
            report.fail(format!("Documents directory {}: {}", dir.display(), e));
            return;
        }
    };

    let Some(first) = pdfs.first() else {
        report.fail(format!("No PDF files in {}", dir.display()));
        return;
    };
    report.pass(format!("Found {} PDF files in {}", pdfs.len(), dir.display()));

    let chunks = PdfExtractor::new().extract(first).and_then(|raw| {
        chunker::chunk(
            &parser::clean(&raw),
            config.rag.chunk_size as usize,
            config.rag.chunk_overlap as usize,
        )
    });

    match chunks {
        Ok(chunks) => report.pass(format!(
            "Processed {} into {} chunks",
            first.display(),
            chunks.len()
        )),
        Err(e) => report.fail(format!("Processing {} failed: {}", first.display(), e)),
    }
}

async fn check_embeddings(provider: &dyn EmbeddingProvider, report: &mut Report) {
    let texts = vec![
        "This is a test sentence.".to_string(),
        "Another test sentence.".to_string(),
    ];

    match provider.embed_batch(&texts).await {
        Ok(embeddings) if embeddings.len() == 2 => {
            report.pass(format!(
                "{} ({}) produced {}x{} embeddings",
                provider.provider_name(),
                provider.model_name(),
                embeddings.len(),
                provider.dimensions()
            ));
            report.pass(format!(
                "Cosine similarity calculation works: {:.3}",
                cosine_similarity(&embeddings[0], &embeddings[1])
            ));
        }
        Ok(embeddings) => report.fail(format!(
            "Expected 2 embeddings, got {}",
            embeddings.len()
        )),
        Err(e) => {
            report.fail(e.to_string());
            if provider.provider_name() == "ollama" {
                println!(
                    "     Ensure Ollama is running and the model is installed: ollama pull {}",
                    provider.model_name()
                );
            }
        }
    }
}

async fn check_store(config: &AppConfig, report: &mut Report) {
    let store = match explainer_knowledge::open_store(config) {
        Ok(store) => store,
        Err(e) => {
            report.fail(e.to_string());
            return;
        }
    };
    report.pass(format!(
        "Loaded {} chunks from {}",
        store.len(),
        config.store_path().display()
    ));

    match store.search(SAMPLE_QUERY, 3).await {
        Ok(results) => {
            report.pass(format!("Search works, found {} results", results.len()));
            if let Some(top) = results.first() {
                let preview: String = top.chunk.text.chars().take(100).collect();
                println!("     Source: {}", top.chunk.source);
                println!("     Similarity: {:.3}", top.similarity);
                println!("     Text preview: {}...", preview);
            }
        }
        Err(e) => report.fail(format!("Search failed: {}", e)),
    }
}

fn check_credentials(config: &AppConfig, report: &mut Report) {
    let provider = config.provider.as_str();

    let Some(env_var) = config.api_key_env(provider) else {
        report.pass(format!(
            "Provider '{}' with model '{}' needs no API key",
            provider, config.model
        ));
        return;
    };

    match config.resolve_api_key(provider) {
        Some(_) => report.pass(format!("API key found for {} ({})", provider, config.model)),
        None => report.fail(missing_key_hint(provider, &env_var)),
    }
}

fn missing_key_hint(provider: &str, env_var: &str) -> String {
    format!(
        "No API key for {}; set {} or EXPLAINER_API_KEY",
        provider, env_var
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_hint_names_configured_variable() {
        let hint = missing_key_hint("claude", "MY_CLAUDE_KEY");
        assert!(hint.contains("MY_CLAUDE_KEY"));
        assert!(!hint.contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_check_credentials_reports_configured_variable() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "llm:\n  activeProvider: claude\n  providers:\n    claude:\n      apiKeyEnv: EXPLAINER_CHECK_UNSET_KEY\n      model: claude-sonnet-4-20250514\n",
        )
        .unwrap();
        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), Some(path)).unwrap();
        let config = AppConfig { api_key: None, ..config };

        let mut report = Report::default();
        check_credentials(&config, &mut report);
        assert_eq!(report.failed, 1);
        assert_eq!(
            config.api_key_env("claude").as_deref(),
            Some("EXPLAINER_CHECK_UNSET_KEY")
        );
    }
}
