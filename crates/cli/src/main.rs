//! DuneGuide CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP chat UI (default)
//! - `chat`: Interactive terminal chat
//! - `ask`: Answer a single question
//! - `ingest`: Load deal passages into the collection
//! - `doctor`: Diagnose configuration and store

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "duneguide",
    about = "DuneGuide — Dubai's AI tourist guide for attraction deals",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the config file (defaults to ~/.duneguide/config.toml)
    #[arg(short, long, global = true, env = "DUNEGUIDE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP chat UI
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat in the terminal
    Chat,

    /// Answer a single question and exit
    Ask {
        /// The question
        #[arg(required = true)]
        query: Vec<String>,

        /// Answer from the passages in this file instead of the stored collection
        #[arg(long)]
        passages: Option<PathBuf>,
    },

    /// Load passages into the collection
    Ingest {
        /// Text file (one passage per line) or JSON array
        file: PathBuf,
    },

    /// Diagnose configuration and store health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Chat => commands::chat::run(config_path).await?,
        Commands::Ask { query, passages } => {
            commands::ask::run(config_path, &query.join(" "), passages.as_deref()).await?
        }
        Commands::Ingest { file } => commands::ingest::run(config_path, &file).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
