//! Shared fakes for pipeline tests.

use duneguide_core::error::{ProviderError, StoreError};
use duneguide_core::provider::{GenerationRequest, GenerationResponse, Provider};
use duneguide_core::store::{Passage, PassageStore};
use std::sync::Mutex;

/// A provider that replays scripted replies and records every prompt.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedProvider {
    replies: Mutex<Vec<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        let mut replies = self.replies.lock().unwrap();
        assert!(
            !replies.is_empty(),
            "ScriptedProvider: no more replies (call #{})",
            prompts.len()
        );
        prompts.push(request.prompt);
        replies.remove(0).map(|text| GenerationResponse {
            text,
            model: request.model,
            usage: None,
        })
    }
}

/// A store that returns a fixed passage list, truncated to the limit.
pub struct StaticStore {
    passages: Vec<Passage>,
    last_limit: Mutex<Option<usize>>,
}

impl StaticStore {
    pub fn new(contents: &[&str]) -> Self {
        Self {
            passages: contents
                .iter()
                .enumerate()
                .map(|(i, c)| Passage {
                    id: format!("deal-{i}"),
                    content: c.to_string(),
                    score: 1.0 - i as f32 * 0.1,
                })
                .collect(),
            last_limit: Mutex::new(None),
        }
    }

    pub fn last_limit(&self) -> Option<usize> {
        *self.last_limit.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl PassageStore for StaticStore {
    fn name(&self) -> &str {
        "static"
    }

    fn collection(&self) -> &str {
        "sme_db"
    }

    async fn query(&self, _text: &str, limit: usize) -> Result<Vec<Passage>, StoreError> {
        *self.last_limit.lock().unwrap() = Some(limit);
        Ok(self.passages.iter().take(limit).cloned().collect())
    }

    async fn add(&self, _texts: Vec<String>) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Storage("read-only".into()))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.passages.len())
    }
}

/// A store whose every query fails.
pub struct FailingStore;

#[async_trait::async_trait]
impl PassageStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    fn collection(&self) -> &str {
        "sme_db"
    }

    async fn query(&self, _text: &str, _limit: usize) -> Result<Vec<Passage>, StoreError> {
        Err(StoreError::QueryFailed("database is locked".into()))
    }

    async fn add(&self, _texts: Vec<String>) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Storage("database is locked".into()))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Err(StoreError::QueryFailed("database is locked".into()))
    }
}
