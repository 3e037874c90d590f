//! `duneguide ask`: Answer one question.
//!
//! With `--passages FILE` the question is answered from a throwaway
//! in-memory collection built from that file; the stored collection is not
//! opened.

use duneguide_agent::{ChatSession, SessionSettings};
use duneguide_config::AppConfig;
use duneguide_core::store::PassageStore;
use duneguide_memory::InMemoryCollection;
use std::path::Path;
use std::sync::Arc;

use super::{CmdResult, backend, ingest::parse_passages, load_config, new_session, require_api_key};

pub async fn run(config_path: Option<&Path>, query: &str, passages: Option<&Path>) -> CmdResult {
    let config = load_config(config_path)?;
    require_api_key(&config)?;

    let mut session = match passages {
        Some(file) => scratch_session(&config, file).await?,
        None => new_session(&config).await?,
    };

    eprint!("  Thinking...");
    let outcome = session.handle_turn(query).await;
    eprint!("\r              \r");

    let outcome = outcome?;
    if let Some(warning) = outcome.warning() {
        eprintln!("[Warning] {warning}");
    }
    if let Some(reply) = outcome.reply() {
        println!("{reply}");
    }
    Ok(())
}

async fn scratch_session(config: &AppConfig, file: &Path) -> CmdResult<ChatSession> {
    let text = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    let backend = backend(config)?;
    let store = InMemoryCollection::new(
        config.store.collection.clone(),
        backend.embedder,
        config.embedding.settings(),
    );
    store.add(parse_passages(&text)?).await?;

    Ok(ChatSession::new(
        Arc::new(store),
        backend.generator,
        SessionSettings::from_config(config),
    ))
}
