//! Hosted model clients for DuneGuide.
//!
//! Every backend implements both `duneguide_core::Provider` (generation)
//! and `duneguide_core::Embedder` (embeddings). The router builds the
//! backend named in configuration.

pub mod gemini;
pub mod openai_compat;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{Backend, build_backend};

use duneguide_core::error::ProviderError;

/// Map a non-success HTTP status to the matching `ProviderError`.
///
/// `body` is only read for statuses without a dedicated variant.
pub(crate) fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

/// Shared HTTP client with the request timeout every backend uses.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error(429, String::new()),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            status_error(403, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        match status_error(500, "boom".into()) {
            ProviderError::ApiError {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
