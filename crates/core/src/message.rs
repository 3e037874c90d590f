//! Message and conversation-log domain types.
//!
//! User submits a query → pipeline answers → both land in the session's
//! [`ConversationLog`] → the log is rendered back after every turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LogError;

/// Label shown in front of user messages when a log is rendered.
pub const USER_LABEL: &str = "You";

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The chatbot
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Render as a single labelled line, e.g. `You: hello`.
    pub fn render(&self, assistant_name: &str) -> String {
        let label = match self.role {
            Role::User => USER_LABEL,
            Role::Assistant => assistant_name,
        };
        format!("{label}: {}", self.content)
    }
}

/// The append-only, session-scoped conversation history.
///
/// Messages strictly alternate user → assistant. There is no removal
/// operation; the log lives exactly as long as its session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLog {
    /// Unique session ID
    pub id: String,

    messages: Vec<Message>,

    /// When this session started
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl ConversationLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a user message. Fails while a previous user message is still
    /// waiting for its reply.
    pub fn append_user(&mut self, content: impl Into<String>) -> Result<(), LogError> {
        if self.awaiting_reply() {
            return Err(LogError::OutOfTurn(
                "previous user message has no assistant reply yet",
            ));
        }
        self.push(Message::user(content));
        Ok(())
    }

    /// Append the assistant reply to the pending user message.
    pub fn append_assistant(&mut self, content: impl Into<String>) -> Result<(), LogError> {
        if !self.awaiting_reply() {
            return Err(LogError::OutOfTurn("no user message awaiting a reply"));
        }
        self.push(Message::assistant(content));
        Ok(())
    }

    /// Append a complete turn (user query plus its reply) in one step.
    pub fn record_turn(
        &mut self,
        query: impl Into<String>,
        reply: impl Into<String>,
    ) -> Result<(), LogError> {
        self.append_user(query)?;
        self.append_assistant(reply)
    }

    /// True when the last message is a user message without a reply.
    pub fn awaiting_reply(&self) -> bool {
        self.messages.last().is_some_and(|m| m.role == Role::User)
    }

    /// All messages in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// One labelled line per message, in insertion order.
    pub fn render_lines(&self, assistant_name: &str) -> Vec<String> {
        self.messages
            .iter()
            .map(|m| m.render(assistant_name))
            .collect()
    }

    /// The whole log as newline-separated labelled lines.
    pub fn render(&self, assistant_name: &str) -> String {
        self.render_lines(assistant_name).join("\n")
    }

    fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, guide!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, guide!");
    }

    #[test]
    fn log_starts_empty() {
        let log = ConversationLog::new();
        assert!(log.is_empty());
        assert!(!log.awaiting_reply());
        assert_eq!(log.render("DuneGuide"), "");
    }

    #[test]
    fn log_alternates_roles() {
        let mut log = ConversationLog::new();
        log.append_user("first").unwrap();
        assert!(log.awaiting_reply());
        log.append_assistant("reply").unwrap();
        log.record_turn("second", "another reply").unwrap();

        let roles: Vec<Role> = log.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[test]
    fn double_user_message_rejected() {
        let mut log = ConversationLog::new();
        log.append_user("first").unwrap();
        let err = log.append_user("second").unwrap_err();
        assert!(matches!(err, LogError::OutOfTurn(_)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn assistant_without_user_rejected() {
        let mut log = ConversationLog::new();
        assert!(log.append_assistant("unprompted").is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn render_uses_role_labels_in_order() {
        let mut log = ConversationLog::new();
        log.record_turn("Any Burj Khalifa deals?", "Yes, At the Top tickets.")
            .unwrap();
        assert_eq!(
            log.render_lines("DuneGuide"),
            vec![
                "You: Any Burj Khalifa deals?".to_string(),
                "DuneGuide: Yes, At the Top tickets.".to_string(),
            ]
        );
    }

    #[test]
    fn log_tracks_updates() {
        let mut log = ConversationLog::new();
        let created = log.created_at;
        log.append_user("hi").unwrap();
        assert!(log.updated_at >= created);
    }

    #[test]
    fn log_serializes_messages() {
        let mut log = ConversationLog::new();
        log.record_turn("q", "a").unwrap();
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["role"], "assistant");
    }
}
