#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use qixi_backend::core::config::{AppConfig, AppPaths};
use qixi_backend::core::errors::ApiError;
use qixi_backend::llm::{ChatRequest, LlmProvider};
use qixi_backend::planner::prompts::ANSWER_FACETS;
use qixi_backend::search::{RawHit, SearchBackend};
use qixi_backend::state::AppState;

/// Answers with one detailed line per plan section named in the prompt.
/// Enrichment prompts get a short fixed reply.
pub struct FacetProvider;

#[async_trait]
impl LlmProvider for FacetProvider {
    fn name(&self) -> &str {
        "facet-stub"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let user = request.content_of("user");
        if user.contains("搜索结果 1") {
            return Ok("额外创意：海边烟花与星空野餐".to_string());
        }
        let detail = "安排细致，预算合理，兼顾氛围与安全。".repeat(4);
        let lines: Vec<String> = ANSWER_FACETS
            .iter()
            .filter(|facet| user.contains(*facet))
            .map(|facet| format!("{facet}：{detail}"))
            .collect();
        if lines.is_empty() {
            return Ok("一起看海吧".to_string());
        }
        Ok(lines.join("\n"))
    }

    fn model_info(&self) -> Value {
        json!({ "type": "stub", "model": "facet" })
    }
}

/// Returns a fixed reply.
pub struct FixedProvider(pub String);

#[async_trait]
impl LlmProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed-stub"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, _request: ChatRequest) -> Result<String, ApiError> {
        Ok(self.0.clone())
    }

    fn model_info(&self) -> Value {
        json!({ "type": "stub", "model": "fixed" })
    }
}

pub struct FailingProvider;

#[async_trait]
impl LlmProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing-stub"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Err(ApiError::ServiceUnavailable)
    }

    async fn chat(&self, _request: ChatRequest) -> Result<String, ApiError> {
        Err(ApiError::Upstream("connection refused".to_string()))
    }

    fn model_info(&self) -> Value {
        json!({ "type": "stub", "model": "failing" })
    }
}

/// Gives a short first answer, then fails every enrichment request.
pub struct EnrichFailsProvider;

#[async_trait]
impl LlmProvider for EnrichFailsProvider {
    fn name(&self) -> &str {
        "enrich-fails-stub"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        if request.content_of("user").contains("搜索结果 1") {
            return Err(ApiError::Upstream("rate limited".to_string()));
        }
        Ok("短答案".to_string())
    }

    fn model_info(&self) -> Value {
        json!({ "type": "stub", "model": "enrich-fails" })
    }
}

pub struct PanickingProvider;

#[async_trait]
impl LlmProvider for PanickingProvider {
    fn name(&self) -> &str {
        "panicking-stub"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, _request: ChatRequest) -> Result<String, ApiError> {
        panic!("bad shape");
    }

    fn model_info(&self) -> Value {
        json!({ "type": "stub", "model": "panicking" })
    }
}

pub struct SlowProvider(pub Duration);

#[async_trait]
impl LlmProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow-stub"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, _request: ChatRequest) -> Result<String, ApiError> {
        tokio::time::sleep(self.0).await;
        Ok("迟到的回答".to_string())
    }

    fn model_info(&self) -> Value {
        json!({ "type": "stub", "model": "slow" })
    }
}

/// Serves one relevant hit per query and counts calls.
#[derive(Default)]
pub struct CountingBackend {
    pub calls: AtomicUsize,
}

impl CountingBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting-stub"
    }

    async fn fetch(&self, query: &str, _max_results: usize) -> Result<Vec<RawHit>, ApiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            RawHit {
                title: format!("七夕约会好去处 {call}"),
                snippet: format!("浪漫海边情侣约会攻略：{query}"),
                url: format!("https://example.com/ideas/{call}"),
                source: "baidu".to_string(),
            },
            RawHit {
                title: "二手手机回收".to_string(),
                snippet: "高价回收旧手机".to_string(),
                url: format!("https://example.com/phones/{call}"),
                source: "baidu".to_string(),
            },
        ])
    }
}

pub struct DownBackend;

#[async_trait]
impl SearchBackend for DownBackend {
    fn name(&self) -> &str {
        "down-stub"
    }

    async fn fetch(&self, _query: &str, _max_results: usize) -> Result<Vec<RawHit>, ApiError> {
        Err(ApiError::Upstream("search engine unreachable".to_string()))
    }
}

/// Offline config rooted at `root`: hash embeddings, no pacing, no web seeding.
pub fn test_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.vector_store.dir = Some(root.join("index"));
    config.search.query_delay_ms = 0;
    config.rag.seed_web_search = false;
    config.rag.request_timeout_secs = 30;
    config
}

pub async fn build_state(
    root: &Path,
    config: AppConfig,
    provider: Arc<dyn LlmProvider>,
    backend: Arc<dyn SearchBackend>,
) -> Arc<AppState> {
    let paths = Arc::new(AppPaths::with_data_dir(
        root.to_path_buf(),
        root.join("data"),
    ));
    AppState::with_backends(paths, config, provider, backend)
        .await
        .expect("state initializes")
}
