//! The retrieval-augmented turn pipeline.
//!
//! Every user query runs the same fixed sequence:
//!
//! 1. **Retrieve** the nearest deal passages from the collection
//! 2. **Compose** the prompt from the template, passages and query
//! 3. **Generate** a reply with the configured provider
//! 4. **Record** the turn in the session's conversation log
//!
//! When retrieval yields nothing (empty collection, no match, or a store
//! failure) steps 2 and 3 are skipped and the fixed fallback message is
//! recorded instead.

pub mod prompt;
pub mod retriever;
pub mod session;

pub use prompt::compose;
pub use retriever::{DEFAULT_TOP_N, retrieve};
pub use session::{ChatSession, SessionSettings, TurnOutcome, TurnStage};

#[cfg(test)]
pub(crate) mod test_helpers;
