//! Text embedding backends.
//!
//! The knowledge store only depends on the [`Embedder`] trait. Two
//! implementations ship with the crate:
//! - [`HashEmbedder`]: deterministic feature hashing, no model server needed
//! - [`RemoteEmbedder`]: any OpenAI-compatible `/v1/embeddings` endpoint

mod hash;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::{EmbeddingBackend, EmbeddingConfig};
use crate::core::errors::ApiError;

pub use hash::HashEmbedder;
pub use remote::RemoteEmbedder;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Embed each input, preserving order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    /// Identity recorded next to stored vectors. Vectors produced under a
    /// different fingerprint are not comparable.
    fn fingerprint(&self) -> String {
        format!("{}:{}", self.name(), self.dimension())
    }
}

pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, ApiError> {
    match config.backend {
        EmbeddingBackend::Hash => Ok(Arc::new(HashEmbedder::new(config.dimension))),
        EmbeddingBackend::Remote => {
            let api_base = config
                .api_base
                .as_deref()
                .filter(|base| !base.trim().is_empty())
                .ok_or_else(|| {
                    ApiError::BadRequest(
                        "embedding.backend is 'remote' but embedding.api_base is missing"
                            .to_string(),
                    )
                })?;
            Ok(Arc::new(RemoteEmbedder::new(
                api_base,
                config.api_key.clone(),
                config.model.clone(),
                config.dimension,
            )))
        }
    }
}
