//! Typed application configuration.
//!
//! Built once at startup by [`ConfigService::load_app_config`](super::ConfigService::load_app_config)
//! and handed to each component's constructor. Every field has a default so an
//! empty `config.yml` yields a runnable (local, offline-embedding) setup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub rag: RagConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_name: "server.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    #[default]
    Auto,
    Remote,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub timeout_secs: u64,
    pub remote: RemoteLlmConfig,
    pub local: LocalLlmConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Auto,
            timeout_secs: 120,
            remote: RemoteLlmConfig::default(),
            local: LocalLlmConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolves `auto` into a concrete backend.
    ///
    /// `auto` picks the remote API only when both the key and the base URL are
    /// present. An explicit `remote` without credentials is a configuration error.
    pub fn resolve_backend(&self) -> Result<LlmBackend, ApiError> {
        let has_credentials = self.remote.has_credentials();
        match self.backend {
            LlmBackend::Auto if has_credentials => Ok(LlmBackend::Remote),
            LlmBackend::Auto => Ok(LlmBackend::Local),
            LlmBackend::Remote if has_credentials => Ok(LlmBackend::Remote),
            LlmBackend::Remote => Err(ApiError::BadRequest(
                "llm.backend is 'remote' but llm.remote.api_key / llm.remote.api_base are missing"
                    .to_string(),
            )),
            LlmBackend::Local => Ok(LlmBackend::Local),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteLlmConfig {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    /// Display label reported by `model_info`.
    pub provider: String,
}

impl Default for RemoteLlmConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            api_key: None,
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            provider: "ChatAnywhere".to_string(),
        }
    }
}

impl RemoteLlmConfig {
    pub fn has_credentials(&self) -> bool {
        non_blank(&self.api_key) && non_blank(&self.api_base)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalLlmConfig {
    pub base_url: String,
    pub model_name: String,
    pub max_new_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub repeat_penalty: f64,
}

impl Default for LocalLlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            model_name: "meta-llama/Llama-2-7b-chat-hf".to_string(),
            max_new_tokens: 512,
            temperature: 0.7,
            top_p: 0.95,
            repeat_penalty: 1.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    #[default]
    Hash,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub dimension: usize,
    pub model: String,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Hash,
            dimension: 384,
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            api_base: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreBackend {
    /// Document-oriented embedded index.
    #[default]
    #[serde(alias = "chroma")]
    Sqlite,
    /// Flat vector index with explicit save/load.
    #[serde(alias = "faiss")]
    Flat,
}

impl VectorStoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorStoreBackend::Sqlite => "sqlite",
            VectorStoreBackend::Flat => "flat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub backend: VectorStoreBackend,
    pub distance: DistanceMetric,
    /// Overrides the default `<data>/vector_db` location.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub supplement_threshold: usize,
    pub supplement_results: usize,
    pub excerpt_chars: usize,
    pub request_timeout_secs: u64,
    pub seed_on_startup: bool,
    pub seed_web_search: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            supplement_threshold: 300,
            supplement_results: 3,
            excerpt_chars: 200,
            request_timeout_secs: 180,
            seed_on_startup: true,
            seed_web_search: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEngine {
    #[default]
    Baidu,
    Duckduckgo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub engine: SearchEngine,
    pub max_results: usize,
    pub per_query_results: usize,
    pub query_delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: SearchEngine::Baidu,
            max_results: 10,
            per_query_results: 5,
            query_delay_ms: 1000,
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
        }
    }
}

impl SearchConfig {
    pub fn query_delay(&self) -> Duration {
        Duration::from_millis(self.query_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
