//! # DuneGuide Core
//!
//! Domain types, traits, and error definitions for the DuneGuide retrieval
//! chatbot. Every external collaborator (embedding model, vector collection,
//! hosted language model) is defined here as a trait; implementations live
//! in their own crates.
//!
//! ## Design Philosophy
//!
//! - Swapping implementations via configuration
//! - Deterministic fakes in tests instead of live network calls
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ConversationLog, Message, Role};
pub use provider::{
    Embedder, EmbeddingRequest, EmbeddingResponse, GenerationRequest, GenerationResponse, Provider,
};
pub use store::{EmbeddingSettings, Passage, PassageStore, Retrieval};
