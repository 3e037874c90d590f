//! Session table: one conversation per browser or API client.

use duneguide_agent::ChatSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// A live session plus the banner to show on its next page render.
pub struct SessionSlot {
    pub chat: ChatSession,
    pub notice: Option<String>,
}

pub type SharedSlot = Arc<Mutex<SessionSlot>>;

struct Entry {
    slot: SharedSlot,
    seq: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

/// Bounded map of session ID to session. The oldest session is evicted when
/// a new one would exceed the capacity.
pub struct SessionTable {
    inner: RwLock<Inner>,
    max_sessions: usize,
}

impl SessionTable {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            max_sessions: max_sessions.max(1),
        }
    }

    pub async fn get(&self, id: &str) -> Option<SharedSlot> {
        self.inner.read().await.entries.get(id).map(|e| e.slot.clone())
    }

    /// Return the session for `id`, or register `make()` under its own ID
    /// when `id` is absent or unknown.
    pub async fn get_or_create(
        &self,
        id: Option<&str>,
        make: impl FnOnce() -> ChatSession,
    ) -> (String, SharedSlot) {
        if let Some(id) = id {
            if let Some(slot) = self.get(id).await {
                return (id.to_string(), slot);
            }
        }

        let chat = make();
        let id = chat.id().to_string();
        let slot = Arc::new(Mutex::new(SessionSlot { chat, notice: None }));

        let mut inner = self.inner.write().await;
        if inner.entries.len() >= self.max_sessions {
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone())
            {
                debug!(session = %oldest, "Evicting oldest session");
                inner.entries.remove(&oldest);
            }
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            id.clone(),
            Entry {
                slot: slot.clone(),
                seq,
            },
        );

        (id, slot)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fake_session, sample_state};

    #[tokio::test]
    async fn creates_then_reuses_session() {
        let state = sample_state(&[], &[]);
        let table = SessionTable::new(10);

        let (id, _) = table.get_or_create(None, || fake_session(&state)).await;
        let (again, _) = table
            .get_or_create(Some(&id), || fake_session(&state))
            .await;
        assert_eq!(id, again);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_id_gets_a_fresh_session() {
        let state = sample_state(&[], &[]);
        let table = SessionTable::new(10);

        let (id, _) = table
            .get_or_create(Some("not-a-session"), || fake_session(&state))
            .await;
        assert_ne!(id, "not-a-session");
        assert!(table.get(&id).await.is_some());
    }

    #[tokio::test]
    async fn evicts_oldest_at_capacity() {
        let state = sample_state(&[], &[]);
        let table = SessionTable::new(2);

        let (first, _) = table.get_or_create(None, || fake_session(&state)).await;
        let (second, _) = table.get_or_create(None, || fake_session(&state)).await;
        let (third, _) = table.get_or_create(None, || fake_session(&state)).await;

        assert_eq!(table.len().await, 2);
        assert!(table.get(&first).await.is_none());
        assert!(table.get(&second).await.is_some());
        assert!(table.get(&third).await.is_some());
    }
}
