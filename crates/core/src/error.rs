//! Error types for the DuneGuide domain.
//!
//! Each bounded context has its own enum; `Error` wraps the ones that can
//! end a turn.

use thiserror::Error;

/// The error a chat turn can fail with.
///
/// Store failures never appear here: retrieval folds them into the
/// fallback reply.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors (generation and embedding) ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Conversation log errors ---
    #[error("Conversation error: {0}")]
    Log(#[from] LogError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(#[from] ProviderError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("Out of turn: {0}")]
    OutOfTurn(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn out_of_turn_append_is_a_turn_error() {
        let err: Error = LogError::OutOfTurn("assistant reply without a query").into();
        assert!(matches!(err, Error::Log(LogError::OutOfTurn(_))));
        assert!(err.to_string().starts_with("Conversation error"));
    }

    #[test]
    fn embedding_failure_wraps_provider_error() {
        let err: StoreError = ProviderError::AuthenticationFailed("bad key".into()).into();
        assert!(err.to_string().contains("Embedding generation failed"));
        assert!(err.to_string().contains("bad key"));
    }
}
