//! Chat command handler.
//!
//! Interactive question loop over stdin with a per-session query quota.

use super::ask::{print_answer, print_sources};
use clap::Args;
use explainer_core::{config::AppConfig, AppResult};
use explainer_knowledge::{RateLimiter, Session};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive question session with per-session limits
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Number of chunks to retrieve (default: rag.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<u32>,

    /// Do not record queries in the query log
    #[arg(long)]
    pub no_log: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");
        config.validate()?;

        let store = explainer_knowledge::open_store(config)?;
        println!("Loaded {} chunks.", store.len());

        let pipeline = explainer_knowledge::pipeline(config, store, !self.no_log)?;
        let top_k = self.top_k.unwrap_or(config.rag.top_k) as usize;

        let limiter = RateLimiter::new(config.limits.max_queries, config.limits.max_input_length);
        let admin_hash = config.admin_password_hash();
        let mut session = Session::new();

        println!("Ask a question, or :admin <password>, :reset, :quit.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim();

            match input {
                "" => continue,
                ":quit" | ":q" => break,
                ":reset" => {
                    limiter.reset_session(&mut session);
                    println!("Session reset.");
                    continue;
                }
                _ => {}
            }

            if let Some(password) = input.strip_prefix(":admin") {
                if limiter.check_admin_password(password.trim(), admin_hash.as_deref()) {
                    limiter.grant_admin(&mut session);
                    println!("Admin access granted. Unlimited queries enabled.");
                } else {
                    println!("Incorrect password.");
                }
                continue;
            }

            let admission = limiter.can_query(&session);
            if !admission.allowed {
                println!("{}", admission.reason);
                println!("Start a new session, or unlock with :admin <password>.");
                continue;
            }

            let length = limiter.check_input_length(input);
            if !length.allowed {
                println!("{}", length.reason);
                continue;
            }

            match pipeline.ask(input, top_k).await {
                Ok(answer) => {
                    limiter.increment_count(&mut session);
                    print_answer(&answer);
                }
                Err(err) => {
                    tracing::error!("Query failed: {}", err);
                    println!("Error: {}", err);
                    if !err.sources.is_empty() {
                        println!("Retrieved sources before the failure:");
                        print_sources(&err.sources);
                    }
                }
            }

            if let Some(remaining) = limiter.remaining(&session) {
                println!();
                println!(
                    "Queries remaining this session: {}/{}",
                    remaining, limiter.max_queries
                );
            }
        }

        println!("Goodbye!");
        Ok(())
    }
}
