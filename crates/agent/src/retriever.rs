//! Passage retrieval.

use duneguide_core::store::{PassageStore, Retrieval};
use tracing::{debug, warn};

/// Neighbours requested when the caller has no configured depth.
pub const DEFAULT_TOP_N: usize = 10;

/// Fetch up to `top_n` passages nearest to `query`.
///
/// Never fails: a store error becomes [`Retrieval::Failed`] and zero hits
/// become [`Retrieval::Empty`]. Passages keep the store's ranking.
pub async fn retrieve(query: &str, store: &dyn PassageStore, top_n: usize) -> Retrieval {
    match store.query(query, top_n).await {
        Ok(passages) => {
            debug!(
                collection = %store.collection(),
                hits = passages.len(),
                "Retrieval complete"
            );
            Retrieval::from_passages(passages)
        }
        Err(e) => {
            warn!(collection = %store.collection(), error = %e, "Error querying database");
            Retrieval::Failed {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingStore, StaticStore};

    #[tokio::test]
    async fn found_passages_keep_store_order() {
        let store = StaticStore::new(&["Burj Khalifa At the Top", "Burj Khalifa SKY lounge"]);
        let retrieval = retrieve("Burj Khalifa deals", &store, DEFAULT_TOP_N).await;

        let passages = retrieval.passages().unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].content, "Burj Khalifa At the Top");
        assert_eq!(store.last_limit(), Some(DEFAULT_TOP_N));
    }

    #[tokio::test]
    async fn top_n_caps_results() {
        let store = StaticStore::new(&["a", "b", "c", "d"]);
        let retrieval = retrieve("deals", &store, 2).await;
        assert_eq!(retrieval.passages().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_store_is_empty_retrieval() {
        let store = StaticStore::new(&[]);
        assert_eq!(retrieve("desert safari", &store, 5).await, Retrieval::Empty);
    }

    #[tokio::test]
    async fn store_error_becomes_failed_retrieval() {
        let retrieval = retrieve("desert safari", &FailingStore, 5).await;
        match &retrieval {
            Retrieval::Failed { reason } => assert!(reason.contains("database is locked")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(retrieval.warning().unwrap().starts_with("Error querying database:"));
    }
}
