//! Provider router: builds the generation/embedding backend named in config.

use duneguide_config::AppConfig;
use duneguide_core::error::ProviderError;
use duneguide_core::provider::{Embedder, Provider};
use std::sync::Arc;
use tracing::debug;

use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// One backend exposed through both capabilities.
#[derive(Clone)]
pub struct Backend {
    pub generator: Arc<dyn Provider>,
    pub embedder: Arc<dyn Embedder>,
}

impl Backend {
    /// Wrap a type implementing both traits.
    pub fn new<T: Provider + Embedder + 'static>(backend: Arc<T>) -> Self {
        Self {
            generator: backend.clone(),
            embedder: backend,
        }
    }
}

/// Build the backend for `config.provider`.
///
/// `gemini` uses the native client. Any other name needs an `api_url`,
/// either from its `[providers.<name>]` table or a well-known default, and
/// is spoken to over the OpenAI-compatible API.
pub fn build_backend(config: &AppConfig) -> Result<Backend, ProviderError> {
    let name = config.provider.as_str();
    let api_key = config.api_key_for(name).unwrap_or_default();
    let api_url = config
        .providers
        .get(name)
        .and_then(|p| p.api_url.clone())
        .or_else(|| default_base_url(name).map(String::from));

    debug!(provider = %name, api_url = ?api_url, "Building provider backend");

    match (name, api_url) {
        ("gemini", None) => Ok(Backend::new(Arc::new(GeminiProvider::new(api_key)))),
        ("gemini", Some(url)) => Ok(Backend::new(Arc::new(
            GeminiProvider::new(api_key).with_base_url(url),
        ))),
        (_, Some(url)) => Ok(Backend::new(Arc::new(OpenAiCompatProvider::new(
            name, url, api_key,
        )))),
        (_, None) => Err(ProviderError::NotConfigured(format!(
            "'{name}' is not a known provider; set providers.{name}.api_url"
        ))),
    }
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "gemini" => Some("https://generativelanguage.googleapis.com/v1beta"),
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        "llamacpp" | "llama.cpp" => Some("http://localhost:8080/v1"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duneguide_config::ProviderConfig;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("gemini").unwrap().contains("generativelanguage"));
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("mystery").is_none());
    }

    #[test]
    fn default_config_builds_gemini() {
        let backend = build_backend(&AppConfig::default()).unwrap();
        assert_eq!(backend.generator.name(), "gemini");
        assert_eq!(backend.embedder.name(), "gemini");
    }

    #[test]
    fn well_known_name_uses_default_url() {
        let config = AppConfig {
            provider: "ollama".into(),
            ..AppConfig::default()
        };
        let backend = build_backend(&config).unwrap();
        assert_eq!(backend.generator.name(), "ollama");
    }

    #[test]
    fn openai_compatible_provider_from_table() {
        let mut config = AppConfig {
            provider: "local".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "local".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://localhost:1234/v1".into()),
            },
        );
        let backend = build_backend(&config).unwrap();
        assert_eq!(backend.generator.name(), "local");
        assert_eq!(backend.embedder.name(), "local");
    }

    #[test]
    fn unknown_provider_without_url_is_not_configured() {
        let config = AppConfig {
            provider: "mystery".into(),
            ..AppConfig::default()
        };
        match build_backend(&config) {
            Err(ProviderError::NotConfigured(msg)) => {
                assert!(msg.contains("providers.mystery.api_url"));
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("an unknown provider must not build"),
        }
    }
}
