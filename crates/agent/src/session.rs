//! Chat sessions and turn processing.

use duneguide_config::AppConfig;
use duneguide_core::error::Result;
use duneguide_core::message::ConversationLog;
use duneguide_core::provider::{GenerationRequest, Provider};
use duneguide_core::store::{Passage, PassageStore, Retrieval};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::prompt::compose;
use crate::retriever::retrieve;

/// Per-session pipeline parameters.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_k: usize,
    pub fallback_message: String,
    pub assistant_name: String,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_k: config.store.top_k,
            fallback_message: config.assistant.fallback_message.clone(),
            assistant_name: config.assistant.name.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Where a session is inside the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Idle,
    QuerySubmitted,
    Retrieving,
    Composing,
    Generating,
    NoMatch,
    Responded,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::QuerySubmitted => "query_submitted",
            Self::Retrieving => "retrieving",
            Self::Composing => "composing",
            Self::Generating => "generating",
            Self::NoMatch => "no_match",
            Self::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// What a single turn produced.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// Passages were found and the model answered.
    Answered {
        reply: String,
        passages: Vec<Passage>,
        prompt: String,
    },
    /// Retrieval came back empty or failed; the fallback was recorded.
    NoMatch {
        reply: String,
        warning: Option<String>,
    },
    /// Blank input; nothing was recorded.
    Ignored,
}

impl TurnOutcome {
    /// The assistant text recorded for this turn.
    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Answered { reply, .. } | Self::NoMatch { reply, .. } => Some(reply),
            Self::Ignored => None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::NoMatch { warning, .. } => warning.as_deref(),
            _ => None,
        }
    }

    /// True when the reply was generated from retrieved passages.
    pub fn matched(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }
}

/// One user's conversation: its log plus the shared collaborators.
pub struct ChatSession {
    log: ConversationLog,
    store: Arc<dyn PassageStore>,
    provider: Arc<dyn Provider>,
    settings: SessionSettings,
    stage: TurnStage,
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn PassageStore>,
        provider: Arc<dyn Provider>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            log: ConversationLog::new(),
            store,
            provider,
            settings,
            stage: TurnStage::Idle,
        }
    }

    /// Session ID (the log's ID).
    pub fn id(&self) -> &str {
        &self.log.id
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn stage(&self) -> TurnStage {
        self.stage
    }

    /// The log as labelled lines, e.g. `You: ...` / `DuneGuide: ...`.
    pub fn render(&self) -> String {
        self.log.render(&self.settings.assistant_name)
    }

    pub fn render_lines(&self) -> Vec<String> {
        self.log.render_lines(&self.settings.assistant_name)
    }

    /// Run one full turn for `query`.
    ///
    /// The user message and its reply are recorded together once the reply
    /// is known. A generation failure is returned and leaves the log as it
    /// was before the turn.
    pub async fn handle_turn(&mut self, query: &str) -> Result<TurnOutcome> {
        if query.trim().is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        self.enter(TurnStage::QuerySubmitted);
        self.enter(TurnStage::Retrieving);
        let retrieval = retrieve(query, self.store.as_ref(), self.settings.top_k).await;

        let outcome = match retrieval {
            Retrieval::Found(passages) => {
                self.enter(TurnStage::Composing);
                let prompt = compose(query, &passages);

                self.enter(TurnStage::Generating);
                let request = GenerationRequest {
                    model: self.settings.model.clone(),
                    prompt: prompt.clone(),
                    temperature: self.settings.temperature,
                    max_tokens: self.settings.max_tokens,
                };
                let response = match self.provider.generate(request).await {
                    Ok(response) => response,
                    Err(e) => {
                        error!(session = %self.log.id, error = %e, "Generation failed");
                        self.enter(TurnStage::Idle);
                        return Err(e.into());
                    }
                };

                TurnOutcome::Answered {
                    reply: response.text,
                    passages,
                    prompt,
                }
            }
            other => {
                self.enter(TurnStage::NoMatch);
                TurnOutcome::NoMatch {
                    reply: self.settings.fallback_message.clone(),
                    warning: other.warning(),
                }
            }
        };

        let reply = outcome.reply().unwrap_or_default().to_string();
        self.log.record_turn(query, reply)?;
        self.enter(TurnStage::Responded);

        info!(
            session = %self.log.id,
            matched = outcome.matched(),
            messages = self.log.len(),
            "Turn complete"
        );
        self.enter(TurnStage::Idle);
        Ok(outcome)
    }

    fn enter(&mut self, stage: TurnStage) {
        debug!(session = %self.log.id, from = %self.stage, to = %stage, "Turn stage");
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingStore, ScriptedProvider, StaticStore};
    use duneguide_config::DEFAULT_FALLBACK_MESSAGE;
    use duneguide_core::error::{Error, ProviderError};
    use duneguide_core::message::Role;

    fn session(store: Arc<dyn PassageStore>, provider: Arc<ScriptedProvider>) -> ChatSession {
        ChatSession::new(store, provider, SessionSettings::default())
    }

    #[tokio::test]
    async fn burj_khalifa_query_is_answered_from_passages() {
        let store = Arc::new(StaticStore::new(&[
            r#"Burj Khalifa "At the Top" level 124: 149 AED"#,
            "Burj Khalifa SKY level 148: 399 AED",
            "Burj Khalifa sunset combo: 229 AED",
        ]));
        let provider = Arc::new(ScriptedProvider::replying(&["Here are three great options!"]));
        let mut chat = session(store.clone(), provider.clone());

        let outcome = chat.handle_turn("Burj Khalifa deals").await.unwrap();

        let TurnOutcome::Answered {
            reply,
            passages,
            prompt,
        } = outcome
        else {
            panic!("expected an answer");
        };
        assert_eq!(reply, "Here are three great options!");
        assert_eq!(passages.len(), 3);
        assert!(prompt.contains("You are a chatbot specializing in helping users find deals"));
        assert!(prompt.contains("Burj Khalifa At the Top level 124: 149 AED"));
        assert!(prompt.contains("Burj Khalifa SKY level 148: 399 AED"));
        assert!(prompt.contains("Burj Khalifa sunset combo: 229 AED"));
        assert!(prompt.contains("for Burj Khalifa only return Burj Khalifa deals"));
        assert_eq!(provider.prompts(), vec![prompt]);
        assert_eq!(store.last_limit(), Some(5));

        assert_eq!(
            chat.render(),
            "You: Burj Khalifa deals\nDuneGuide: Here are three great options!"
        );
        assert_eq!(chat.stage(), TurnStage::Idle);
    }

    #[tokio::test]
    async fn empty_store_records_fallback_without_generation() {
        let provider = Arc::new(ScriptedProvider::replying(&[]));
        let mut chat = session(Arc::new(StaticStore::new(&[])), provider.clone());

        let outcome = chat.handle_turn("desert safari").await.unwrap();

        assert!(!outcome.matched());
        assert_eq!(outcome.reply(), Some(DEFAULT_FALLBACK_MESSAGE));
        assert!(outcome.warning().is_none());
        assert_eq!(provider.call_count(), 0);
        assert_eq!(chat.log().messages()[1].content, DEFAULT_FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn store_failure_warns_and_session_keeps_going() {
        let provider = Arc::new(ScriptedProvider::replying(&[]));
        let mut chat = session(Arc::new(FailingStore), provider.clone());

        let first = chat.handle_turn("desert safari").await.unwrap();
        assert!(first.warning().unwrap().contains("database is locked"));
        assert_eq!(first.reply(), Some(DEFAULT_FALLBACK_MESSAGE));

        let second = chat.handle_turn("dhow cruise").await.unwrap();
        assert_eq!(second.reply(), Some(DEFAULT_FALLBACK_MESSAGE));
        assert_eq!(chat.log().len(), 4);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn generation_failure_leaves_log_untouched() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            }),
            Ok("Second time lucky".into()),
        ]));
        let mut chat = session(Arc::new(StaticStore::new(&["Aquarium: 90 AED"])), provider);

        let err = chat.handle_turn("aquarium").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::RateLimited { .. })));
        assert!(chat.log().is_empty());
        assert_eq!(chat.stage(), TurnStage::Idle);

        chat.handle_turn("aquarium").await.unwrap();
        assert_eq!(chat.log().len(), 2);
    }

    #[tokio::test]
    async fn blank_query_is_ignored() {
        let provider = Arc::new(ScriptedProvider::replying(&[]));
        let mut chat = session(Arc::new(StaticStore::new(&["x"])), provider);

        assert!(matches!(
            chat.handle_turn("   ").await.unwrap(),
            TurnOutcome::Ignored
        ));
        assert!(chat.log().is_empty());
    }

    #[tokio::test]
    async fn every_user_message_is_followed_by_assistant() {
        let provider = Arc::new(ScriptedProvider::replying(&["one", "two"]));
        let store: Arc<dyn PassageStore> = Arc::new(StaticStore::new(&["Marina cruise"]));
        let mut chat = session(store, provider);

        chat.handle_turn("cruise").await.unwrap();
        chat.handle_turn("cheaper cruise").await.unwrap();

        let messages = chat.log().messages();
        assert_eq!(messages.len(), 4);
        for (i, m) in messages.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(m.role, expected);
        }
        assert_eq!(messages[3].content, "two");
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.store.top_k = 3;
        config.assistant.name = "Guide".into();
        let settings = SessionSettings::from_config(&config);
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.assistant_name, "Guide");
        assert_eq!(settings.model, "gemini-pro");
    }
}
