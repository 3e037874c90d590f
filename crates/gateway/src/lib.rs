//! HTTP gateway for DuneGuide.
//!
//! Serves the single-page chat UI, a small JSON API over the same session
//! table, and a health check.
//!
//! Built on Axum for async HTTP.

pub mod api;
pub mod frontend;
pub mod sessions;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use duneguide_agent::{ChatSession, SessionSettings};
use duneguide_config::GatewayConfig;
use duneguide_core::provider::Provider;
use duneguide_core::store::PassageStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use sessions::SessionTable;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub store: Arc<dyn PassageStore>,
    pub provider: Arc<dyn Provider>,
    pub settings: SessionSettings,
    pub sessions: SessionTable,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(
        store: Arc<dyn PassageStore>,
        provider: Arc<dyn Provider>,
        settings: SessionSettings,
        max_sessions: usize,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
            sessions: SessionTable::new(max_sessions),
        }
    }

    /// A fresh session bound to the shared collection and provider.
    pub fn new_session(&self) -> ChatSession {
        ChatSession::new(
            self.store.clone(),
            self.provider.clone(),
            self.settings.clone(),
        )
    }
}

/// Build the full router.
///
/// Layers applied:
/// - Request body size limit (64 KB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(frontend::frontend_router())
        .nest("/v1", api::v1_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and serve until the process exits.
pub async fn start(
    config: &GatewayConfig,
    state: SharedState,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
