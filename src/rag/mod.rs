//! Retrieval layer: chunk splitting, vector indexes and the knowledge store.

pub mod flat;
pub mod knowledge;
pub mod splitter;
pub mod sqlite;
pub mod store;

pub use knowledge::{KnowledgeStore, StatValue, StoreStats};
pub use splitter::RecursiveTextSplitter;
pub use store::{Chunk, ChunkSearchResult, VectorIndex};
