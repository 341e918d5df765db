//! NSS query CLI
//!
//! Main entry point for the `nss` command-line tool.
//! Answers questions about National Security Strategy documents from the
//! terminal or over HTTP.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ServeCommand, StatsCommand};
use nss_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Ask questions about National Security Strategy documents
#[derive(Parser, Debug)]
#[command(name = "nss")]
#[command(about = "Question answering over National Security Strategy documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "NSS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "NSS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openrouter, openai, ollama)
    #[arg(short, long, global = true, env = "NSS_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "NSS_MODEL")]
    model: Option<String>,

    /// LanceDB directory holding the document table
    #[arg(long, global = true, env = "NSS_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question
    Ask(AskCommand),

    /// Show corpus statistics
    Stats(StatsCommand),

    /// Serve the query API over HTTP
    Serve(ServeCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.store,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, cli.log_json)?;

    tracing::info!("NSS CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);
    tracing::debug!("Store: {:?}", config.store_path());

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
        Commands::Serve(_) => "serve",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = async {
        match cli.command {
            Commands::Ask(cmd) => {
                config.validate()?;
                cmd.execute(&config).await
            }
            Commands::Stats(cmd) => cmd.execute(&config).await,
            Commands::Serve(cmd) => {
                config.validate()?;
                cmd.execute(&config).await
            }
        }
    };
    let result = tracing::Instrument::instrument(result, span).await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
