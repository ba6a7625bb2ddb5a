use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rag::StoreStats;
use crate::search::SearchResult;

/// A retrieved chunk as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Leading excerpt of the chunk text.
    pub content: String,
    pub metadata: Map<String, Value>,
}

/// The planner's only output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningResult {
    pub answer: String,
    pub source_documents: Vec<SourceDocument>,
    pub search_results: Vec<SearchResult>,
    #[serde(rename = "rag_used")]
    pub used_retrieval: bool,
}

impl PlanningResult {
    /// Result carrying only a failure description.
    pub fn degraded(answer: String) -> Self {
        Self {
            answer,
            source_documents: Vec::new(),
            search_results: Vec::new(),
            used_retrieval: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub llm_ready: bool,
    pub vector_db_stats: StoreStats,
    pub model_info: Value,
    pub rag_chain_ready: bool,
}
