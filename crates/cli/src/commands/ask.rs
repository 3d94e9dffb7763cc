//! Ask command handler.
//!
//! Answers one question from the indexed documents.

use clap::Args;
use explainer_core::{config::AppConfig, AppResult};
use explainer_knowledge::{RagAnswer, SourceRef};

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Number of chunks to retrieve (default: rag.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<u32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not record the query in the query log
    #[arg(long)]
    pub no_log: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        config.validate()?;

        let store = explainer_knowledge::open_store(config)?;
        let pipeline = explainer_knowledge::pipeline(config, store, !self.no_log)?;
        let top_k = self.top_k.unwrap_or(config.rag.top_k) as usize;

        match pipeline.ask(&self.query, top_k).await {
            Ok(answer) => {
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&answer)?);
                } else {
                    print_answer(&answer);
                }
                Ok(())
            }
            Err(err) => {
                if !err.sources.is_empty() {
                    println!("Retrieved sources before the failure:");
                    print_sources(&err.sources);
                }
                Err(err.error)
            }
        }
    }
}

/// Human-readable answer with numbered sources.
pub fn print_answer(answer: &RagAnswer) {
    println!("Answer:");
    println!("{}", answer.answer);
    println!();

    if answer.sources.is_empty() {
        println!("Sources: (no sources available)");
    } else {
        println!("Sources:");
        print_sources(&answer.sources);
    }

    if let Some(tokens) = answer.tokens {
        println!();
        println!("Tokens: {} in, {} out", tokens.input, tokens.output);
    }
}

pub fn print_sources(sources: &[SourceRef]) {
    for (i, source) in sources.iter().enumerate() {
        println!(
            "[{}] {} (chunk {}, similarity {:.3})",
            i + 1,
            source.source,
            source.chunk_id,
            source.similarity
        );
        println!("    {}", source.text_preview);
    }
}
