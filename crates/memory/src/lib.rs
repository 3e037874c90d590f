//! Vector collection implementations for DuneGuide.

pub mod in_memory;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryCollection;
pub use vector::{StoredPassage, content_id, cosine_similarity, vector_search};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCollection;

use duneguide_core::error::{ProviderError, StoreError};
use duneguide_core::provider::Embedder;
use duneguide_core::store::EmbeddingSettings;

/// Embed `texts` in a single call, checking one vector comes back per text.
pub(crate) async fn embed_all(
    embedder: &dyn Embedder,
    settings: &EmbeddingSettings,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>, StoreError> {
    let expected = texts.len();
    let response = embedder.embed(settings.request(texts)).await?;
    if response.embeddings.len() != expected {
        return Err(StoreError::EmbeddingFailed(ProviderError::ApiError {
            status_code: 200,
            message: format!(
                "Expected {expected} embeddings, got {}",
                response.embeddings.len()
            ),
        }));
    }
    Ok(response.embeddings)
}
