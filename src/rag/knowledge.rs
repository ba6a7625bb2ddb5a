//! Knowledge store: chunking, embedding and the persisted vector index.
//!
//! Corruption and backend failures are handled here. Callers see an empty
//! result, never an error, from [`KnowledgeStore::search`] and
//! [`KnowledgeStore::stats`].

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::flat::FlatIndex;
use super::splitter::RecursiveTextSplitter;
use super::sqlite::SqliteRagStore;
use super::store::{Chunk, VectorIndex};
use crate::core::config::{DistanceMetric, RagConfig, VectorStoreBackend, VectorStoreConfig};
use crate::core::errors::ApiError;
use crate::embedding::Embedder;

/// Best-effort numeric statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatValue {
    Known(usize),
    Unknown,
    Error,
}

impl Serialize for StatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatValue::Known(value) => serializer.serialize_u64(*value as u64),
            StatValue::Unknown => serializer.serialize_str("unknown"),
            StatValue::Error => serializer.serialize_str("error"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub backend: String,
    pub document_count: StatValue,
    pub embedding_dimension: StatValue,
}

pub struct KnowledgeStore {
    embedder: Arc<dyn Embedder>,
    splitter: RecursiveTextSplitter,
    index: RwLock<Box<dyn VectorIndex>>,
    backend: VectorStoreBackend,
}

impl KnowledgeStore {
    /// Opens the index under `dir`, creating it when absent and recreating it
    /// when it is unreadable or was built by a different embedder.
    pub async fn initialize(
        dir: &Path,
        store_config: &VectorStoreConfig,
        rag_config: &RagConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, ApiError> {
        fs::create_dir_all(dir).map_err(ApiError::internal)?;
        let backend = store_config.backend;
        let mut index = open_or_recreate(backend, dir, store_config.distance).await?;

        let fingerprint = embedder.fingerprint();
        let stored = index.stored_model().await?;
        if stored.as_deref() != Some(fingerprint.as_str()) {
            let existing = index.count().await.unwrap_or(0);
            if existing > 0 {
                warn!(
                    backend = backend.as_str(),
                    previous = ?stored,
                    current = %fingerprint,
                    discarded = existing,
                    "Embedding model changed; rebuilding knowledge index"
                );
            }
            index.reindex_with_model(&fingerprint).await?;
        }

        let count = index.count().await.unwrap_or(0);
        info!(
            backend = backend.as_str(),
            path = %dir.display(),
            documents = count,
            "Knowledge store ready"
        );

        Ok(Self {
            embedder,
            splitter: RecursiveTextSplitter::new(rag_config.chunk_size, rag_config.chunk_overlap),
            index: RwLock::new(index),
            backend,
        })
    }

    pub fn backend(&self) -> VectorStoreBackend {
        self.backend
    }

    /// Splits, embeds and inserts `chunks`, returning the number of stored
    /// fragments. The index is persisted before this returns; on error
    /// nothing from this call is visible.
    pub async fn add(&self, chunks: Vec<Chunk>) -> Result<usize, ApiError> {
        let fragments = self.splitter.split_chunks(chunks);
        if fragments.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = fragments.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != fragments.len() {
            return Err(ApiError::Internal(format!(
                "embedder returned {} vectors for {} fragments",
                embeddings.len(),
                fragments.len()
            )));
        }

        let inserted = fragments.len();
        let items = fragments.into_iter().zip(embeddings).collect();
        {
            let mut index = self.index.write().await;
            index.insert_batch(items).await?;
        }

        info!(backend = self.backend.as_str(), fragments = inserted, "Added chunks to knowledge store");
        Ok(inserted)
    }

    /// The `k` nearest chunks, best first. Empty on any failure.
    pub async fn search(&self, query: &str, k: usize) -> Vec<Chunk> {
        match self.try_search(query, k).await {
            Ok(chunks) => chunks,
            Err(err) => {
                warn!(error = %err, "Knowledge search failed; continuing without context");
                Vec::new()
            }
        }
    }

    pub async fn try_search(&self, query: &str, k: usize) -> Result<Vec<Chunk>, ApiError> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        if self.index.read().await.count().await? == 0 {
            debug!("Knowledge store is empty");
            return Ok(Vec::new());
        }

        let mut embeddings = self.embedder.embed(&[query.to_string()]).await?;
        let Some(query_embedding) = embeddings.pop() else {
            return Err(ApiError::Internal("embedder returned no query vector".to_string()));
        };

        let index = self.index.read().await;
        let hits = index.search(&query_embedding, k).await?;
        debug!(hits = hits.len(), "Knowledge search complete");
        Ok(hits.into_iter().map(|hit| hit.chunk).collect())
    }

    pub async fn document_count(&self) -> StatValue {
        match self.index.read().await.count().await {
            Ok(count) => StatValue::Known(count),
            Err(err) => {
                warn!(error = %err, "Failed to count documents");
                StatValue::Error
            }
        }
    }

    pub async fn stats(&self) -> StoreStats {
        let document_count = self.document_count().await;
        let embedding_dimension = match self.index.read().await.dimension().await {
            Ok(Some(dimension)) => StatValue::Known(dimension),
            Ok(None) => StatValue::Unknown,
            Err(_) => StatValue::Error,
        };

        StoreStats {
            backend: self.backend.as_str().to_string(),
            document_count,
            embedding_dimension,
        }
    }
}

async fn open_index(
    backend: VectorStoreBackend,
    dir: &Path,
    metric: DistanceMetric,
) -> Result<Box<dyn VectorIndex>, ApiError> {
    match backend {
        VectorStoreBackend::Sqlite => Ok(Box::new(SqliteRagStore::open(dir, metric).await?)),
        VectorStoreBackend::Flat => Ok(Box::new(FlatIndex::load(dir, metric)?)),
    }
}

async fn open_or_recreate(
    backend: VectorStoreBackend,
    dir: &Path,
    metric: DistanceMetric,
) -> Result<Box<dyn VectorIndex>, ApiError> {
    match open_index(backend, dir, metric).await {
        Ok(index) => Ok(index),
        Err(err) => {
            warn!(
                backend = backend.as_str(),
                path = %dir.display(),
                error = %err,
                "Knowledge index unreadable; recreating an empty one"
            );
            discard_index(backend, dir).map_err(ApiError::internal)?;
            open_index(backend, dir, metric).await
        }
    }
}

fn discard_index(backend: VectorStoreBackend, dir: &Path) -> std::io::Result<()> {
    match backend {
        VectorStoreBackend::Sqlite => {
            SqliteRagStore::remove_files(&dir.join(super::sqlite::DB_FILE_NAME))
        }
        VectorStoreBackend::Flat => FlatIndex::remove_files(dir),
    }
}
