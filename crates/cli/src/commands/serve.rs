//! `duneguide serve`: Start the HTTP chat UI.

use duneguide_agent::SessionSettings;
use duneguide_core::store::PassageStore;
use duneguide_gateway::GatewayState;
use std::path::Path;
use std::sync::Arc;

use super::{CmdResult, load_config, open_pipeline, require_api_key};

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> CmdResult {
    let mut config = load_config(config_path)?;
    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    require_api_key(&config)?;

    let (store, provider) = open_pipeline(&config).await?;
    let passages = store.count().await.unwrap_or(0);

    println!("🏙️ DuneGuide");
    println!("   Listening:  http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:   {} ({})", config.provider, config.model);
    println!(
        "   Collection: {} ({passages} passages)",
        config.store.collection
    );

    let state = Arc::new(GatewayState::new(
        store,
        provider,
        SessionSettings::from_config(&config),
        config.gateway.max_sessions,
    ));
    duneguide_gateway::start(&config.gateway, state).await
}
