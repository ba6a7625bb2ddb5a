//! Web search: backends, relevance filtering and the dating-ideas sweep.

mod baidu;
mod client;
mod duckduckgo;
pub mod relevance;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

pub use baidu::BaiduBackend;
pub use client::SearchClient;
pub use duckduckgo::DuckDuckGoBackend;

/// A hit as parsed from a backend, before cleaning and scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source: String,
}

/// A cleaned, domain-relevant and scored search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source: String,
    pub relevance_score: f64,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Issues `query` as-is and parses up to `max_results` hits.
    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, ApiError>;
}
