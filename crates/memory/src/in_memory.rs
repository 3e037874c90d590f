//! In-memory collection: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use duneguide_core::error::StoreError;
use duneguide_core::provider::Embedder;
use duneguide_core::store::{EmbeddingSettings, Passage, PassageStore};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::embed_all;
use crate::vector::{StoredPassage, content_id, vector_search};

/// A collection that keeps passages and embeddings in a Vec.
pub struct InMemoryCollection {
    name: String,
    embedder: Arc<dyn Embedder>,
    settings: EmbeddingSettings,
    entries: RwLock<Vec<StoredPassage>>,
}

impl InMemoryCollection {
    pub fn new(
        name: impl Into<String>,
        embedder: Arc<dyn Embedder>,
        settings: EmbeddingSettings,
    ) -> Self {
        Self {
            name: name.into(),
            embedder,
            settings,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PassageStore for InMemoryCollection {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn collection(&self) -> &str {
        &self.name
    }

    async fn query(&self, text: &str, limit: usize) -> Result<Vec<Passage>, StoreError> {
        if self.entries.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings =
            embed_all(self.embedder.as_ref(), &self.settings, vec![text.to_string()]).await?;
        let query_embedding = embeddings.pop().unwrap_or_default();

        let entries = self.entries.read().await;
        Ok(vector_search(&entries, &query_embedding, limit))
    }

    async fn add(&self, texts: Vec<String>) -> Result<Vec<String>, StoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = embed_all(self.embedder.as_ref(), &self.settings, texts.clone()).await?;
        let mut entries = self.entries.write().await;
        let mut ids = Vec::with_capacity(texts.len());

        for (content, embedding) in texts.into_iter().zip(embeddings) {
            let id = content_id(&content);
            match entries.iter_mut().find(|e| e.passage.id == id) {
                Some(existing) => existing.embedding = embedding,
                None => entries.push(StoredPassage {
                    passage: Passage {
                        id: id.clone(),
                        content,
                        score: 0.0,
                    },
                    embedding,
                }),
            }
            ids.push(id);
        }

        Ok(ids)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BrokenEmbedder, KeywordEmbedder};

    fn collection(embedder: Arc<dyn Embedder>) -> InMemoryCollection {
        InMemoryCollection::new("sme_db", embedder, EmbeddingSettings::default())
    }

    #[tokio::test]
    async fn empty_collection_skips_embedding() {
        let embedder = Arc::new(KeywordEmbedder::default());
        let store = collection(embedder.clone());

        let results = store.query("desert safari", 5).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn add_and_query_ranks_nearest_first() {
        let embedder = Arc::new(KeywordEmbedder::default());
        let store = collection(embedder.clone());

        store
            .add(vec![
                "Dhow cruise at the Marina: 120 AED".into(),
                "Evening desert safari with BBQ: 150 AED".into(),
                "Burj Khalifa At the Top tickets: 149 AED".into(),
            ])
            .await
            .unwrap();
        assert_eq!(embedder.calls(), 1);

        let results = store.query("desert safari deals", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].content.contains("safari"));
        assert_eq!(store.collection(), "sme_db");
    }

    #[tokio::test]
    async fn re_adding_same_text_is_idempotent() {
        let store = collection(Arc::new(KeywordEmbedder::default()));
        let first = store.add(vec!["Aquarium entry: 90 AED".into()]).await.unwrap();
        let second = store.add(vec!["Aquarium entry: 90 AED".into()]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn embedding_failure_is_reported() {
        let store = collection(Arc::new(BrokenEmbedder));
        let err = store.add(vec!["Burj Al Arab tour".into()]).await.unwrap_err();
        assert!(matches!(err, StoreError::EmbeddingFailed(_)));
    }
}
