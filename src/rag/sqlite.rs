//! SQLite-backed document index.
//!
//! Chunk text, metadata and embeddings live in one table; similarity search
//! is a brute-force scan scored in process.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{Chunk, ChunkSearchResult, VectorIndex};
use crate::core::config::DistanceMetric;
use crate::core::errors::ApiError;
use crate::vector_math;

pub const DB_FILE_NAME: &str = "rag.db";

pub struct SqliteRagStore {
    pool: SqlitePool,
    db_path: PathBuf,
    metric: DistanceMetric,
}

impl SqliteRagStore {
    pub async fn open(dir: &Path, metric: DistanceMetric) -> Result<Self, ApiError> {
        Self::with_path(dir.join(DB_FILE_NAME), metric).await
    }

    /// Opens (or creates) the database and verifies its integrity.
    pub async fn with_path(db_path: PathBuf, metric: DistanceMetric) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self {
            pool,
            db_path,
            metric,
        };
        store.check_integrity().await?;
        store.init_schema().await?;
        Ok(store)
    }

    /// Removes the database and its WAL side files.
    pub fn remove_files(db_path: &Path) -> std::io::Result<()> {
        for suffix in ["", "-wal", "-shm"] {
            let mut name = db_path.as_os_str().to_owned();
            name.push(suffix);
            let path = PathBuf::from(name);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    async fn check_integrity(&self) -> Result<(), ApiError> {
        let verdict: String = sqlx::query_scalar("PRAGMA quick_check")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        if verdict.eq_ignore_ascii_case("ok") {
            Ok(())
        } else {
            Err(ApiError::Internal(format!(
                "integrity check failed for {}: {}",
                self.db_path.display(),
                verdict
            )))
        }
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Chunk {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Map<String, Value>>(&metadata_str).unwrap_or_default();

        Chunk {
            content: row.get("content"),
            metadata,
        }
    }
}

#[async_trait]
impl VectorIndex for SqliteRagStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    async fn insert_batch(&mut self, items: Vec<(Chunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str =
                serde_json::to_string(&chunk.metadata).map_err(ApiError::internal)?;

            sqlx::query(
                "INSERT INTO rag_chunks (chunk_id, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&chunk.content)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT content, metadata, embedding FROM rag_chunks ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = vector_math::similarity(self.metric, query_embedding, &stored).ok()?;

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }

    async fn dimension(&self) -> Result<Option<usize>, ApiError> {
        let bytes: Option<i64> =
            sqlx::query_scalar("SELECT LENGTH(embedding) FROM rag_chunks LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        Ok(bytes.map(|len| len as usize / 4))
    }

    async fn stored_model(&self) -> Result<Option<String>, ApiError> {
        sqlx::query_scalar("SELECT value FROM rag_meta WHERE key = 'embedding_model'")
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)
    }

    async fn reindex_with_model(&mut self, embedding_model: &str) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM rag_chunks")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "INSERT OR REPLACE INTO rag_meta (key, value, updated_at)
             VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(embedding_model)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(dir: &Path) -> SqliteRagStore {
        SqliteRagStore::open(dir, DistanceMetric::Cosine).await.unwrap()
    }

    fn chunk(content: &str, category: &str) -> Chunk {
        Chunk::new(content).with_meta("category", category)
    }

    #[tokio::test]
    async fn insert_and_search_orders_by_similarity() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = test_store(tmp.path()).await;

        store
            .insert_batch(vec![
                (chunk("海边日落", "beach"), vec![1.0, 0.0, 0.0]),
                (chunk("电影之夜", "movie"), vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.dimension().await.unwrap(), Some(3));

        let results = store.search(&[0.9, 0.1, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "海边日落");
        assert_eq!(results[0].chunk.metadata["category"], "beach");
    }

    #[tokio::test]
    async fn empty_store_searches_to_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(tmp.path()).await;

        assert!(store.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
        assert_eq!(store.dimension().await.unwrap(), None);
    }

    #[tokio::test]
    async fn reindex_with_model_clears_and_records_identity() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = test_store(tmp.path()).await;

        store
            .insert_batch(vec![(chunk("data", "x"), vec![1.0])])
            .await
            .unwrap();
        assert_eq!(store.stored_model().await.unwrap(), None);

        store.reindex_with_model("hash:384").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.stored_model().await.unwrap().as_deref(), Some("hash:384"));
    }

    #[tokio::test]
    async fn garbage_file_fails_to_open() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(DB_FILE_NAME), "definitely not sqlite".repeat(512)).unwrap();

        assert!(SqliteRagStore::open(tmp.path(), DistanceMetric::Cosine)
            .await
            .is_err());
    }
}
