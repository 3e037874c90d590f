//! JSON API.
//!
//! - `POST /v1/chat`: Run one turn (creates the session if needed)
//! - `GET  /v1/sessions/{id}`: Read a session's messages

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use duneguide_agent::{ChatSession, TurnOutcome};
use duneguide_core::message::Role;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::SharedState;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router() -> Router<SharedState> {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/sessions/{id}", get(get_session_handler))
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageDto {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub matched: bool,
    pub warning: Option<String>,
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn message_dtos(chat: &ChatSession) -> Vec<MessageDto> {
    chat.log()
        .messages()
        .iter()
        .map(|m| MessageDto {
            role: m.role,
            content: m.content.clone(),
        })
        .collect()
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "message must not be empty",
        ));
    }

    let (session_id, slot) = state
        .sessions
        .get_or_create(payload.session_id.as_deref(), || state.new_session())
        .await;
    info!(session = %session_id, "v1/chat request");

    let mut slot = slot.lock().await;
    let outcome = slot.chat.handle_turn(&payload.message).await.map_err(|e| {
        error!(session = %session_id, error = %e, "Turn failed");
        api_error(StatusCode::BAD_GATEWAY, e.to_string())
    })?;

    let (reply, matched, warning) = match &outcome {
        TurnOutcome::Answered { reply, .. } => (reply.clone(), true, None),
        TurnOutcome::NoMatch { reply, warning } => (reply.clone(), false, warning.clone()),
        TurnOutcome::Ignored => (String::new(), false, None),
    };

    Ok(Json(ChatResponse {
        messages: message_dtos(&slot.chat),
        session_id,
        reply,
        matched,
        warning,
    }))
}

async fn get_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let slot = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("session {id} not found")))?;

    let slot = slot.lock().await;
    Ok(Json(SessionResponse {
        messages: message_dtos(&slot.chat),
        session_id: id,
    }))
}
