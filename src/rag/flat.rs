//! Flat vector index persisted as a single JSON document.
//!
//! The whole index lives in memory. Every mutation writes a complete new
//! snapshot to a temp file, renames it over `index.json`, and only then
//! replaces the in-memory state, so a failed save leaves both untouched.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::store::{Chunk, ChunkSearchResult, VectorIndex};
use crate::core::config::DistanceMetric;
use crate::core::errors::ApiError;
use crate::vector_math;

pub const INDEX_DIR_NAME: &str = "flat";
const INDEX_FILE_NAME: &str = "index.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FlatSnapshot {
    #[serde(default)]
    embedding_model: Option<String>,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    entries: Vec<FlatEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FlatEntry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

pub struct FlatIndex {
    path: PathBuf,
    metric: DistanceMetric,
    snapshot: FlatSnapshot,
}

impl FlatIndex {
    pub fn index_dir(base: &Path) -> PathBuf {
        base.join(INDEX_DIR_NAME)
    }

    /// Loads `<base>/flat/index.json`, or starts empty when it does not exist.
    pub fn load(base: &Path, metric: DistanceMetric) -> Result<Self, ApiError> {
        let dir = Self::index_dir(base);
        fs::create_dir_all(&dir).map_err(ApiError::internal)?;
        let path = dir.join(INDEX_FILE_NAME);

        let snapshot = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(ApiError::internal)?;
            let snapshot: FlatSnapshot = serde_json::from_str(&raw).map_err(|err| {
                ApiError::Internal(format!("unreadable index {}: {}", path.display(), err))
            })?;
            validate(&snapshot)?;
            snapshot
        } else {
            FlatSnapshot::default()
        };

        Ok(Self {
            path,
            metric,
            snapshot,
        })
    }

    pub fn remove_files(base: &Path) -> std::io::Result<()> {
        let dir = Self::index_dir(base);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    fn save(&self, snapshot: &FlatSnapshot) -> Result<(), ApiError> {
        let payload = serde_json::to_vec(snapshot).map_err(ApiError::internal)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload).map_err(ApiError::internal)?;
        fs::rename(&tmp, &self.path).map_err(ApiError::internal)?;
        Ok(())
    }
}

fn validate(snapshot: &FlatSnapshot) -> Result<(), ApiError> {
    let expected = snapshot
        .dimension
        .or_else(|| snapshot.entries.first().map(|e| e.embedding.len()));
    if let Some(dim) = expected {
        if let Some(bad) = snapshot.entries.iter().find(|e| e.embedding.len() != dim) {
            return Err(ApiError::Internal(format!(
                "inconsistent vector dimension in flat index: {} != {}",
                bad.embedding.len(),
                dim
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for FlatIndex {
    fn kind(&self) -> &'static str {
        "flat"
    }

    async fn insert_batch(&mut self, items: Vec<(Chunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut next = self.snapshot.clone();
        for (chunk, embedding) in items {
            let dim = *next.dimension.get_or_insert(embedding.len());
            if embedding.len() != dim {
                return Err(ApiError::BadRequest(format!(
                    "embedding dimension {} does not match index dimension {}",
                    embedding.len(),
                    dim
                )));
            }
            next.entries.push(FlatEntry { chunk, embedding });
        }

        self.save(&next)?;
        self.snapshot = next;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        if limit == 0 || self.snapshot.entries.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self
            .snapshot
            .entries
            .iter()
            .map(|entry| entry.embedding.as_slice());
        let ranked = vector_math::rank_descending(self.metric, query_embedding, candidates)?;

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(idx, score)| ChunkSearchResult {
                chunk: self.snapshot.entries[idx].chunk.clone(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, ApiError> {
        Ok(self.snapshot.entries.len())
    }

    async fn dimension(&self) -> Result<Option<usize>, ApiError> {
        Ok(self.snapshot.dimension)
    }

    async fn stored_model(&self) -> Result<Option<String>, ApiError> {
        Ok(self.snapshot.embedding_model.clone())
    }

    async fn reindex_with_model(&mut self, embedding_model: &str) -> Result<(), ApiError> {
        let next = FlatSnapshot {
            embedding_model: Some(embedding_model.to_string()),
            ..FlatSnapshot::default()
        };
        self.save(&next)?;
        self.snapshot = next;
        Ok(())
    }
}
