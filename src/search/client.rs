use std::cmp::Ordering;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tracing::{info, warn};

use super::relevance::to_result;
use super::{BaiduBackend, DuckDuckGoBackend, RawHit, SearchBackend, SearchResult};
use crate::core::config::{SearchConfig, SearchEngine};
use crate::core::errors::ApiError;

/// Appended to every outbound query.
pub const DOMAIN_SUFFIX: &str = "七夕 约会 浪漫 情侣";

/// Suffixes for the multi-query dating-ideas sweep.
pub const IDEA_VARIANTS: [&str; 4] = ["约会创意", "浪漫约会", "情侣活动", "约会攻略"];

type Pacer = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct SearchClient {
    backend: Arc<dyn SearchBackend>,
    pacer: Option<Pacer>,
    max_results: usize,
    per_query_results: usize,
}

impl SearchClient {
    /// Builds the backend selected by `search.engine`.
    pub fn from_config(config: &SearchConfig) -> Result<Self, ApiError> {
        let backend: Arc<dyn SearchBackend> = match config.engine {
            SearchEngine::Baidu => Arc::new(BaiduBackend::new(&config.user_agent, config.timeout())?),
            SearchEngine::Duckduckgo => {
                Arc::new(DuckDuckGoBackend::new(&config.user_agent, config.timeout())?)
            }
        };
        Ok(Self::new(backend, config))
    }

    pub fn new(backend: Arc<dyn SearchBackend>, config: &SearchConfig) -> Self {
        // One request per `query_delay`, no burst. A zero delay disables pacing.
        let pacer = Quota::with_period(config.query_delay())
            .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));

        Self {
            backend,
            pacer,
            max_results: config.max_results.max(1),
            per_query_results: config.per_query_results.max(1),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Relevant results for `query`, deduplicated by URL and sorted by
    /// descending score. Empty on any backend failure.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        match self.try_search(query, max_results).await {
            Ok(results) => results,
            Err(err) => {
                warn!(backend = self.backend.name(), query, error = %err, "Search failed");
                Vec::new()
            }
        }
    }

    pub async fn try_search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ApiError> {
        let max_results = if max_results == 0 {
            self.max_results
        } else {
            max_results
        };
        let augmented = format!("{} {}", query.trim(), DOMAIN_SUFFIX);

        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }
        let hits = self.backend.fetch(&augmented, max_results).await?;
        let fetched = hits.len();
        let results = rank(hits);
        info!(
            backend = self.backend.name(),
            query,
            fetched,
            relevant = results.len(),
            "Search complete"
        );
        Ok(results)
    }

    /// Runs every idea variant for `topic` in sequence, merges, deduplicates
    /// by URL and keeps the best `max_results`. A failing variant contributes
    /// nothing.
    pub async fn search_dating_ideas(&self, topic: &str) -> Vec<SearchResult> {
        let mut merged = Vec::new();
        for variant in IDEA_VARIANTS {
            let query = format!("{} {}", topic.trim(), variant);
            merged.extend(self.search(&query, self.per_query_results).await);
        }

        let mut unique = dedupe_by_url(merged);
        sort_by_score(&mut unique);
        unique.truncate(self.max_results);
        unique
    }
}

fn rank(hits: Vec<RawHit>) -> Vec<SearchResult> {
    let scored: Vec<SearchResult> = hits.iter().filter_map(to_result).collect();
    let mut unique = dedupe_by_url(scored);
    sort_by_score(&mut unique);
    unique
}

/// Keeps the first result per URL; results without a URL are dropped.
fn dedupe_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|result| !result.url.is_empty() && seen.insert(result.url.clone()))
        .collect()
}

fn sort_by_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;

    use super::*;

    struct ScriptedBackend {
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    fn raw(title: &str, snippet: &str, url: &str) -> RawHit {
        RawHit {
            title: title.to_string(),
            snippet: snippet.to_string(),
            url: url.to_string(),
            source: "baidu".to_string(),
        }
    }

    #[async_trait]
    impl SearchBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self, query: &str, _max_results: usize) -> Result<Vec<RawHit>, ApiError> {
            self.queries.lock().unwrap().push(query.to_string());
            if query.contains("情侣活动") {
                return Err(ApiError::Upstream("connection reset".to_string()));
            }
            Ok(vec![
                raw("七夕约会指南", "浪漫的约会", "https://shared.example"),
                raw("股票", "行情", "https://irrelevant.example"),
                raw("情侣", "一起看电影", &format!("https://unique.example/{}", query.len())),
                raw("约会", "没有链接", ""),
            ])
        }
    }

    fn config(delay_ms: u64) -> SearchConfig {
        SearchConfig {
            query_delay_ms: delay_ms,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn search_appends_domain_keywords_and_filters() {
        let backend = ScriptedBackend::new();
        let client = SearchClient::new(backend.clone(), &config(0));

        let results = client.search("海边", 5).await;

        assert_eq!(
            backend.queries.lock().unwrap()[0],
            format!("海边 {}", DOMAIN_SUFFIX)
        );
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://shared.example");
        assert!(results[0].relevance_score >= results[1].relevance_score);
    }

    #[tokio::test]
    async fn dating_ideas_survive_failed_variant_and_dedupe() {
        let backend = ScriptedBackend::new();
        let client = SearchClient::new(backend.clone(), &config(0));

        let results = client.search_dating_ideas("海边").await;

        assert_eq!(backend.queries.lock().unwrap().len(), 4);
        let urls: HashSet<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls.len(), results.len());
        assert!(urls.contains("https://shared.example"));
        assert!(results.len() >= 2);
        assert!(results
            .windows(2)
            .all(|w| w[0].relevance_score >= w[1].relevance_score));
    }

    struct DownBackend;

    #[async_trait]
    impl SearchBackend for DownBackend {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch(&self, _query: &str, _max: usize) -> Result<Vec<RawHit>, ApiError> {
            Err(ApiError::Upstream("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn failing_backend_yields_empty() {
        let client = SearchClient::new(Arc::new(DownBackend), &config(0));
        assert!(client.search("约会", 5).await.is_empty());
        assert!(client.search_dating_ideas("约会").await.is_empty());
        assert!(client.try_search("约会", 5).await.is_err());
    }

    #[tokio::test]
    async fn pacing_spaces_outbound_requests() {
        let backend = ScriptedBackend::new();
        let client = SearchClient::new(backend, &config(50));

        let started = Instant::now();
        client.search_dating_ideas("约会").await;
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn dedupe_keeps_first_and_drops_empty_urls() {
        let make = |url: &str, score: f64| SearchResult {
            title: "t".into(),
            snippet: "s".into(),
            url: url.into(),
            source: "baidu".into(),
            relevance_score: score,
        };
        let out = dedupe_by_url(vec![make("a", 1.0), make("", 9.0), make("a", 5.0), make("b", 2.0)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].relevance_score, 1.0);
    }
}
