//! Vector index abstraction shared by the knowledge store backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::ApiError;

/// An atomic unit of retrievable text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// Insertion-ordered scalar metadata (type, category, source, url, score).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Chunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: Chunk,
    /// Similarity score (higher = closer).
    pub score: f32,
}

/// Capability set every persisted index provides.
///
/// Callers only ever hold a `Box<dyn VectorIndex>`; the concrete backend is
/// chosen once from configuration.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Short backend label reported in stats.
    fn kind(&self) -> &'static str;

    /// Inserts all items and persists them. Either every item is stored or
    /// none is.
    async fn insert_batch(&mut self, items: Vec<(Chunk, Vec<f32>)>) -> Result<(), ApiError>;

    /// The `limit` nearest chunks, best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    async fn count(&self) -> Result<usize, ApiError>;

    /// Dimension of stored vectors, `None` while empty.
    async fn dimension(&self) -> Result<Option<usize>, ApiError>;

    /// Fingerprint of the embedder that produced the stored vectors.
    async fn stored_model(&self) -> Result<Option<String>, ApiError>;

    /// Drops every vector and records `embedding_model` as the new identity.
    async fn reindex_with_model(&mut self, embedding_model: &str) -> Result<(), ApiError>;
}
