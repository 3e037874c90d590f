//! Passage store trait: the vector collection the chatbot retrieves from.
//!
//! A store holds tourism deal passages together with their embeddings and
//! answers nearest-neighbour queries. Query text is embedded through the
//! [`Embedder`](crate::provider::Embedder) the store was opened with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::provider::EmbeddingRequest;

/// A stored passage (one tourism deal record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Stable ID inside the collection
    pub id: String,

    /// The passage text
    pub content: String,

    /// Similarity to the query (set by search operations)
    #[serde(default)]
    pub score: f32,
}

/// Fixed parameters of every embedding call a collection makes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl EmbeddingSettings {
    /// Build a request for `inputs` carrying these settings.
    pub fn request(&self, inputs: Vec<String>) -> EmbeddingRequest {
        EmbeddingRequest {
            model: self.model.clone(),
            inputs,
            task_type: self.task_type.clone(),
            title: self.title.clone(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "models/embedding-001".into(),
            task_type: Some("retrieval_document".into()),
            title: Some("Custom query".into()),
        }
    }
}

/// Outcome of a retrieval attempt.
///
/// Empty and failed retrievals are ordinary values so the no-match fallback
/// can be exercised without any error machinery.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// At least one passage, in the order the store ranked them.
    Found(Vec<Passage>),
    /// The store answered with zero documents.
    Empty,
    /// The store call failed; the reason is surfaced as a warning.
    Failed { reason: String },
}

impl Retrieval {
    /// Build from a store result, collapsing an empty list into `Empty`.
    pub fn from_passages(passages: Vec<Passage>) -> Self {
        if passages.is_empty() {
            Self::Empty
        } else {
            Self::Found(passages)
        }
    }

    /// The retrieved passages, or `None` for empty/failed retrievals.
    pub fn passages(&self) -> Option<&[Passage]> {
        match self {
            Self::Found(p) => Some(p),
            _ => None,
        }
    }

    /// The warning to surface for a failed retrieval.
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Failed { reason } => Some(format!("Error querying database: {reason}")),
            _ => None,
        }
    }
}

/// The core PassageStore trait.
///
/// Implementations: SQLite persistent collection, in-memory (for tests).
#[async_trait]
pub trait PassageStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// The collection this handle is bound to.
    fn collection(&self) -> &str;

    /// Return up to `limit` passages nearest to `text`, most similar first.
    async fn query(&self, text: &str, limit: usize) -> Result<Vec<Passage>, StoreError>;

    /// Embed and insert passages, returning their IDs. Re-adding identical
    /// text does not create duplicates.
    async fn add(&self, texts: Vec<String>) -> Result<Vec<String>, StoreError>;

    /// Number of passages in the collection.
    async fn count(&self) -> Result<usize, StoreError>;
}
