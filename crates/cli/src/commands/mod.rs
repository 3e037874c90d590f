//! Subcommands and the wiring they share.

pub mod ask;
pub mod chat;
pub mod doctor;
pub mod ingest;
pub mod serve;

use duneguide_agent::{ChatSession, SessionSettings};
use duneguide_config::AppConfig;
use duneguide_core::provider::{Embedder, Provider};
use duneguide_core::store::PassageStore;
use duneguide_memory::SqliteCollection;
use duneguide_providers::{Backend, build_backend};
use std::path::Path;
use std::sync::Arc;

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config(path: Option<&Path>) -> CmdResult<AppConfig> {
    Ok(AppConfig::load(path).map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Fail early with setup instructions when no credential is available.
pub fn require_api_key(config: &AppConfig) -> CmdResult {
    if config.has_api_key() {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables (or put it in ./.env):");
    eprintln!("    GEMINI_API_KEY=...      (recommended)");
    eprintln!("    DUNEGUIDE_API_KEY=...   (generic)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    eprintln!("  Get a Gemini key at: https://aistudio.google.com/app/apikey");
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}

/// The configured generation/embedding backend.
pub fn backend(config: &AppConfig) -> CmdResult<Backend> {
    Ok(build_backend(config)?)
}

/// Open the persistent collection named in config.
pub async fn open_store(
    config: &AppConfig,
    embedder: Arc<dyn Embedder>,
) -> CmdResult<Arc<SqliteCollection>> {
    let store = SqliteCollection::open(
        &config.store.path,
        &config.store.collection,
        embedder,
        config.embedding.settings(),
    )
    .await
    .map_err(|e| {
        format!(
            "Failed to open vector store at {}: {e}",
            config.store.path.display()
        )
    })?;
    Ok(Arc::new(store))
}

/// Everything a chat turn needs: the shared collection and generator.
pub async fn open_pipeline(
    config: &AppConfig,
) -> CmdResult<(Arc<dyn PassageStore>, Arc<dyn Provider>)> {
    let backend = backend(config)?;
    let store: Arc<dyn PassageStore> = open_store(config, backend.embedder).await?;
    Ok((store, backend.generator))
}

pub async fn new_session(config: &AppConfig) -> CmdResult<ChatSession> {
    let (store, provider) = open_pipeline(config).await?;
    Ok(ChatSession::new(
        store,
        provider,
        SessionSettings::from_config(config),
    ))
}
