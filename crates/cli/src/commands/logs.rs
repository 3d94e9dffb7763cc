//! Logs command handler.
//!
//! Views the SQLite query log: aggregates, recent queries, single-query
//! details and JSON export.

use chrono::NaiveDateTime;
use clap::{Args, Subcommand};
use explainer_core::{config::AppConfig, AppError, AppResult};
use explainer_knowledge::QueryLogger;
use std::path::PathBuf;

const RULE_WIDTH: usize = 70;

/// Inspect the query log
#[derive(Args, Debug)]
pub struct LogsCommand {
    #[command(subcommand)]
    pub action: LogsAction,
}

#[derive(Subcommand, Debug)]
pub enum LogsAction {
    /// Show aggregate token and cost statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the most recent queries
    Recent {
        /// Number of queries to show
        #[arg(default_value = "10")]
        n: usize,
    },

    /// Show one query in full
    Details {
        /// Query ID
        id: i64,
    },

    /// Export every logged query to a JSON file
    Export {
        /// Output file
        #[arg(default_value = "query_logs.json")]
        path: PathBuf,
    },
}

impl LogsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing logs command");

        let logger = QueryLogger::open(&config.log_db_path())?;
        let rule = "=".repeat(RULE_WIDTH);

        match &self.action {
            LogsAction::Stats { json } => {
                let stats = logger.stats()?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                    return Ok(());
                }

                println!("{}", rule);
                println!("QUERY LOG STATISTICS");
                println!("{}", rule);
                println!("Total queries: {}", stats.total_queries);
                println!();
                println!("Token Usage:");
                println!("  Total tokens: {}", stats.total_tokens);
                println!("  Input tokens: {}", stats.total_input_tokens);
                println!("  Output tokens: {}", stats.total_output_tokens);
                println!();
                println!("Cost Analysis:");
                println!("  Total cost: ${:.4}", stats.total_cost);
                println!(
                    "  Average cost per query: ${:.4}",
                    stats.total_cost / stats.total_queries.max(1) as f64
                );
                println!();
                println!("Averages per query:");
                println!("  Input tokens: {:.0}", stats.avg_input_tokens);
                println!("  Output tokens: {:.0}", stats.avg_output_tokens);
                println!("  Chunks retrieved: {:.1}", stats.avg_chunks);
                println!("{}", rule);
            }
            LogsAction::Recent { n } => {
                let queries = logger.recent(*n)?;

                println!("MOST RECENT {} QUERIES", queries.len());
                println!("{}", rule);
                for (i, q) in queries.iter().enumerate() {
                    println!();
                    println!("[{}] #{} {}", i + 1, q.id, display_timestamp(&q.timestamp));
                    println!("Query: {}", truncate(&q.query, 100));
                    println!(
                        "Tokens: {} in, {} out (${:.4})",
                        q.input_tokens, q.output_tokens, q.cost_estimate_usd
                    );
                    println!("Chunks: {}", q.chunks_retrieved);
                    println!("{}", "-".repeat(RULE_WIDTH));
                }
            }
            LogsAction::Details { id } => {
                let q = logger
                    .get(*id)?
                    .ok_or_else(|| AppError::Other(format!("Query ID {} not found", id)))?;

                println!("{}", rule);
                println!("QUERY DETAILS - ID {}", q.id);
                println!("{}", rule);
                println!("Timestamp: {}", display_timestamp(&q.timestamp));
                println!("Model: {}", q.model);
                println!();
                println!("Query:");
                println!("{}", q.query);
                println!();
                println!("Answer:");
                println!("{}", q.answer);
                println!();
                println!("Token Usage:");
                println!("  Input: {}", q.input_tokens);
                println!("  Output: {}", q.output_tokens);
                println!("  Total: {}", q.total_tokens);
                println!("  Cost: ${:.4}", q.cost_estimate_usd);
                println!();
                println!("Sources Retrieved ({} chunks):", q.chunks_retrieved);
                for (i, source) in q.sources.iter().enumerate() {
                    println!(
                        "  {}. {} (similarity: {:.3})",
                        i + 1,
                        source.source,
                        source.similarity
                    );
                }
                println!("{}", rule);
            }
            LogsAction::Export { path } => {
                let count = logger.export_json(path)?;
                println!("Exported {} queries to {}", count, path.display());
            }
        }

        Ok(())
    }
}

/// `2024-11-02 14:03:11` from a stored ISO timestamp; unparseable values pass through.
fn display_timestamp(timestamp: &str) -> String {
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_timestamp() {
        assert_eq!(
            display_timestamp("2024-11-02T14:03:11.123456"),
            "2024-11-02 14:03:11"
        );
        assert_eq!(display_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 100), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
