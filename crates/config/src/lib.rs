//! Configuration loading, validation, and management for DuneGuide.
//!
//! Loads configuration from `~/.duneguide/config.toml` (or an explicit path)
//! with environment variable overrides. A `.env` file in the working
//! directory is read first so the generative-API credential can live there.

use duneguide_core::store::EmbeddingSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The fixed assistant reply when retrieval finds nothing.
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't find any relevant deals. Please try another query!";

/// Environment variables consulted for the API key, highest priority first.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "DUNEGUIDE_API_KEY"];

/// The root configuration structure.
///
/// Maps directly to `~/.duneguide/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the generative provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider used for generation and embeddings
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Generation model
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature; unset keeps the provider's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Max tokens per generation; unset keeps the provider's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Embedding call parameters
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector collection location and retrieval depth
    #[serde(default)]
    pub store: StoreConfig,

    /// Chatbot persona as shown to the user
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-pro".into()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("embedding", &self.embedding)
            .field("store", &self.store)
            .field("assistant", &self.assistant)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_task_type")]
    pub task_type: Option<String>,

    #[serde(default = "default_title")]
    pub title: Option<String>,
}

fn default_embedding_model() -> String {
    "models/embedding-001".into()
}
fn default_task_type() -> Option<String> {
    Some("retrieval_document".into())
}
fn default_title() -> Option<String> {
    Some("Custom query".into())
}

impl EmbeddingConfig {
    pub fn settings(&self) -> EmbeddingSettings {
        EmbeddingSettings {
            model: self.model.clone(),
            task_type: self.task_type.clone(),
            title: self.title.clone(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            task_type: default_task_type(),
            title: default_title(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the collection database
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Passages retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("database")
}
fn default_collection() -> String {
    "sme_db".into()
}
fn default_top_k() -> usize {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_name")]
    pub name: String,

    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

fn default_assistant_name() -> String {
    "DuneGuide".into()
}
fn default_fallback_message() -> String {
    DEFAULT_FALLBACK_MESSAGE.into()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
            fallback_message: default_fallback_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Live browser sessions kept before the oldest is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_port() -> u16 {
    8501
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_sessions() -> usize {
    1000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Load `.env` from the working directory (if any), then the config file
    /// at `path` or the default location, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(env_path) => tracing::debug!("Loaded environment from {}", env_path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::EnvFile(e.to_string())),
        }

        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir().join("config.toml"),
        };
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// The API key from the environment only fills an unset key; the other
    /// variables always win over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = API_KEY_VARS.iter().find_map(|var| lookup(var));
        }
        if let Some(provider) = lookup("DUNEGUIDE_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = lookup("DUNEGUIDE_MODEL") {
            self.model = model;
        }
        if let Some(path) = lookup("DUNEGUIDE_DB_PATH") {
            self.store.path = PathBuf::from(path);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".duneguide")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.store.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "store.top_k must be at least 1".into(),
            ));
        }

        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.collection must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// The key for the active provider: provider-specific first, then global.
    pub fn api_key_for(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.as_deref())
            .or(self.api_key.as_deref())
    }

    /// Check if an API key is available for the active provider.
    pub fn has_api_key(&self) -> bool {
        self.api_key_for(&self.provider).is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            model: default_model(),
            temperature: None,
            max_tokens: None,
            embedding: EmbeddingConfig::default(),
            store: StoreConfig::default(),
            assistant: AssistantConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to load .env file: {0}")]
    EnvFile(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, "gemini-pro");
        assert_eq!(config.store.collection, "sme_db");
        assert_eq!(config.store.top_k, 5);
        assert_eq!(config.assistant.name, "DuneGuide");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.embedding.title, config.embedding.title);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: Some(5.0),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_top_k_rejected() {
        let mut config = AppConfig::default();
        config.store.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider, "gemini");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
model = "gemini-1.5-flash"

[store]
path = "/var/lib/duneguide"

[embedding]
model = "models/text-embedding-004"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.store.path, PathBuf::from("/var/lib/duneguide"));
        assert_eq!(config.store.collection, "sme_db");
        assert_eq!(config.embedding.model, "models/text-embedding-004");
        assert_eq!(config.embedding.task_type.as_deref(), Some("retrieval_document"));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model = [unterminated").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_supplies_missing_api_key() {
        let mut config = AppConfig::default();
        config.apply_env(|key| match key {
            "GEMINI_API_KEY" => Some("gm-key".into()),
            "DUNEGUIDE_API_KEY" => Some("generic-key".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("gm-key"));
        assert!(config.has_api_key());
    }

    #[test]
    fn env_does_not_replace_file_api_key() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(|key| (key == "GEMINI_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn env_overrides_model_and_db_path() {
        let mut config = AppConfig::default();
        config.apply_env(|key| match key {
            "DUNEGUIDE_MODEL" => Some("gemini-1.5-pro".into()),
            "DUNEGUIDE_DB_PATH" => Some("/tmp/deals".into()),
            _ => None,
        });
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.store.path, PathBuf::from("/tmp/deals"));
    }

    #[test]
    fn provider_specific_key_wins() {
        let mut config = AppConfig {
            api_key: Some("global".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "gemini".into(),
            ProviderConfig {
                api_key: Some("scoped".into()),
                api_url: None,
            },
        );
        assert_eq!(config.api_key_for("gemini"), Some("scoped"));
        assert_eq!(config.api_key_for("openai"), Some("global"));
    }

    #[test]
    fn debug_redacts_keys() {
        let config = AppConfig {
            api_key: Some("super-secret".into()),
            ..AppConfig::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("[REDACTED]"));
    }
}
