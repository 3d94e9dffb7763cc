//! Explainer CLI
//!
//! Main entry point for the explainer command-line tool.
//! Answers questions about a local folder of PDFs with retrieval-augmented generation.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, ChatCommand, CheckCommand, HashPasswordCommand, IndexCommand, LogsCommand,
};
use explainer_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Explainer - ask questions about your PDF papers
#[derive(Parser, Debug)]
#[command(name = "explainer")]
#[command(about = "Question answering over a local PDF collection", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "EXPLAINER_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "EXPLAINER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider for answers (claude, ollama)
    #[arg(short, long, global = true, env = "EXPLAINER_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "EXPLAINER_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract, chunk and embed every PDF in the documents directory
    Index(IndexCommand),

    /// Ask a single question
    Ask(AskCommand),

    /// Interactive question session with per-session limits
    Chat(ChatCommand),

    /// Inspect the query log
    Logs(LogsCommand),

    /// Verify the setup without calling the language model
    Check(CheckCommand),

    /// Print the SHA-256 hash of an admin password
    HashPassword(HashPasswordCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Workspace and config file come first: they decide which YAML is merged
    let config = AppConfig::load_from(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Explainer CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Logs(_) => "logs",
        Commands::Check(_) => "check",
        Commands::HashPassword(_) => "hash-password",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Logs(cmd) => cmd.execute(&config),
        Commands::Check(cmd) => cmd.execute(&config).await,
        Commands::HashPassword(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
