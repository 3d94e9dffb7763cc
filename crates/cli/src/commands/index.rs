//! Index command handler.
//!
//! Builds the embedding store from a directory of PDFs.

use clap::Args;
use explainer_core::{config::AppConfig, AppResult};
use explainer_knowledge::PdfExtractor;
use std::path::PathBuf;

/// Extract, chunk and embed every PDF in the documents directory
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Directory of PDFs (default: rag.documentsDir)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command");

        let stats =
            explainer_knowledge::index_documents(config, self.dir.as_deref(), &PdfExtractor::new())
                .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        println!(
            "Indexed {} documents into {} chunks in {:.2}s",
            stats.documents_count, stats.chunks_count, stats.duration_secs
        );
        println!("Store: {}", config.store_path().display());

        if !stats.failures.is_empty() {
            println!();
            println!("Skipped {} documents:", stats.failures.len());
            for failure in &stats.failures {
                println!("- {}: {}", failure.source, failure.error);
            }
        }

        Ok(())
    }
}
