//! SQLite-backed persistent collection.
//!
//! Uses a single database file (`duneguide.sqlite3`) inside the configured
//! store directory with two tables:
//! - `collections`: registered collection names
//! - `passages`: passage text plus its embedding as little-endian `f32` bytes
//!
//! Similarity ranking happens in process over the collection's rows.

use async_trait::async_trait;
use chrono::Utc;
use duneguide_core::error::StoreError;
use duneguide_core::provider::Embedder;
use duneguide_core::store::{EmbeddingSettings, Passage, PassageStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::embed_all;
use crate::vector::{StoredPassage, content_id, vector_search};

/// Database file created inside the store directory.
pub const DB_FILE: &str = "duneguide.sqlite3";

/// A named collection inside a persistent SQLite database.
pub struct SqliteCollection {
    pool: SqlitePool,
    name: String,
    embedder: Arc<dyn Embedder>,
    settings: EmbeddingSettings,
}

impl SqliteCollection {
    /// Open (or create) the collection `name` under the directory `path`.
    ///
    /// The directory, database file and schema are created when absent.
    /// Opening the same path and name again yields a handle to the same data.
    pub async fn open(
        path: &Path,
        name: &str,
        embedder: Arc<dyn Embedder>,
        settings: EmbeddingSettings,
    ) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(path).await.map_err(|e| {
            StoreError::Storage(format!("Cannot create {}: {e}", path.display()))
        })?;

        let options = SqliteConnectOptions::new()
            .filename(path.join(DB_FILE))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let collection = Self {
            pool,
            name: name.to_string(),
            embedder,
            settings,
        };
        collection.run_migrations().await?;
        collection.register().await?;
        info!(
            collection = %name,
            path = %path.display(),
            "SQLite collection opened"
        );
        Ok(collection)
    }

    /// Run schema migrations: creates tables and indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name        TEXT PRIMARY KEY,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("collections table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS passages (
                iid         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL,
                collection  TEXT NOT NULL REFERENCES collections(name),
                content     TEXT NOT NULL,
                embedding   BLOB NOT NULL,
                created_at  TEXT NOT NULL,
                UNIQUE(collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("passages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_passages_collection ON passages(collection, iid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("collection index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Register the collection name; a no-op when it already exists.
    async fn register(&self) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO collections (name, created_at) VALUES (?1, ?2)")
            .bind(&self.name)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("Register collection: {e}")))?;
        Ok(())
    }

    /// Load every passage in the collection, in insertion order.
    async fn load_all(&self) -> Result<Vec<StoredPassage>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, content, embedding FROM passages WHERE collection = ?1 ORDER BY iid",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Passage scan: {e}")))?;

        rows.iter().map(Self::row_to_stored).collect()
    }

    fn row_to_stored(row: &sqlx::sqlite::SqliteRow) -> Result<StoredPassage, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?;
        let blob: Vec<u8> = row
            .try_get("embedding")
            .map_err(|e| StoreError::QueryFailed(format!("embedding column: {e}")))?;

        Ok(StoredPassage {
            passage: Passage {
                id,
                content,
                score: 0.0,
            },
            embedding: Self::blob_to_embedding(&blob),
        })
    }

    /// Serialize an embedding vector to bytes.
    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

#[async_trait]
impl PassageStore for SqliteCollection {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn collection(&self) -> &str {
        &self.name
    }

    async fn query(&self, text: &str, limit: usize) -> Result<Vec<Passage>, StoreError> {
        let entries = self.load_all().await?;
        if entries.is_empty() {
            debug!(collection = %self.name, "Collection is empty");
            return Ok(Vec::new());
        }

        let mut embeddings =
            embed_all(self.embedder.as_ref(), &self.settings, vec![text.to_string()]).await?;
        let query_embedding = embeddings.pop().unwrap_or_default();

        let results = vector_search(&entries, &query_embedding, limit);
        debug!(
            collection = %self.name,
            scanned = entries.len(),
            returned = results.len(),
            "Vector query complete"
        );
        Ok(results)
    }

    async fn add(&self, texts: Vec<String>) -> Result<Vec<String>, StoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = embed_all(self.embedder.as_ref(), &self.settings, texts.clone()).await?;
        let created_at = Utc::now().to_rfc3339();
        let mut ids = Vec::with_capacity(texts.len());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        for (content, embedding) in texts.iter().zip(&embeddings) {
            let id = content_id(content);
            sqlx::query(
                r#"
                INSERT INTO passages (id, collection, content, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(collection, id) DO UPDATE SET
                    embedding = excluded.embedding
                "#,
            )
            .bind(&id)
            .bind(&self.name)
            .bind(content)
            .bind(Self::embedding_to_blob(embedding))
            .bind(&created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT failed: {e}")))?;
            ids.push(id);
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(collection = %self.name, count = ids.len(), "Stored passages");
        Ok(ids)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM passages WHERE collection = ?1")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT failed: {e}")))?;

        let n: i64 = row
            .try_get("n")
            .map_err(|e| StoreError::QueryFailed(format!("count column: {e}")))?;
        Ok(n as usize)
    }
}
