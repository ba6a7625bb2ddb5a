use std::sync::Arc;

use tracing::info;

use crate::core::config::{AppConfig, AppPaths};
use crate::embedding::build_embedder;
use crate::llm::{build_provider, GenerationService, LlmProvider};
use crate::planner::{seed_knowledge_base, DatingPlanner, PlannerOptions, SeedReport};
use crate::rag::KnowledgeStore;
use crate::search::{SearchBackend, SearchClient};

pub mod error;

use error::InitializationError;

/// Application state shared by the HTTP routes and the REPL.
///
/// Built once from the typed config; every component gets its settings
/// through its constructor.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub store: Arc<KnowledgeStore>,
    pub search: Arc<SearchClient>,
    pub planner: Arc<DatingPlanner>,
}

impl AppState {
    /// Builds the configured LLM provider and search backend, then the rest
    /// of the pipeline.
    pub async fn initialize(
        paths: Arc<AppPaths>,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let provider =
            build_provider(&config.llm).map_err(|e| InitializationError::Llm(e.into()))?;
        let search = SearchClient::from_config(&config.search)
            .map_err(|e| InitializationError::Search(e.into()))?;

        Self::assemble(paths, config, provider, search).await
    }

    /// Same as [`initialize`](Self::initialize) with caller-supplied
    /// generation and search backends.
    pub async fn with_backends(
        paths: Arc<AppPaths>,
        config: AppConfig,
        provider: Arc<dyn LlmProvider>,
        search_backend: Arc<dyn SearchBackend>,
    ) -> Result<Arc<Self>, InitializationError> {
        let search = SearchClient::new(search_backend, &config.search);
        Self::assemble(paths, config, provider, search).await
    }

    async fn assemble(
        paths: Arc<AppPaths>,
        config: AppConfig,
        provider: Arc<dyn LlmProvider>,
        search: SearchClient,
    ) -> Result<Arc<Self>, InitializationError> {
        let embedder =
            build_embedder(&config.embedding).map_err(|e| InitializationError::Config(e.into()))?;

        let index_dir = config
            .vector_store
            .dir
            .clone()
            .unwrap_or_else(|| paths.index_dir.clone());
        let store = Arc::new(
            KnowledgeStore::initialize(&index_dir, &config.vector_store, &config.rag, embedder)
                .await
                .map_err(|e| InitializationError::Rag(e.into()))?,
        );

        let search = Arc::new(search);
        let generator = GenerationService::new(provider);
        info!(
            llm = generator.provider_name(),
            search = search.backend_name(),
            store = store.backend().as_str(),
            "Planner components ready"
        );

        let planner = Arc::new(DatingPlanner::new(
            store.clone(),
            generator,
            search.clone(),
            PlannerOptions::from_config(&config.rag),
        ));

        Ok(Arc::new(AppState {
            paths,
            config: Arc::new(config),
            store,
            search,
            planner,
        }))
    }

    /// Runs first-run seeding when enabled in config.
    pub async fn seed(&self) -> SeedReport {
        if !self.config.rag.seed_on_startup {
            return SeedReport::default();
        }
        let search = self
            .config
            .rag
            .seed_web_search
            .then_some(self.search.as_ref());
        seed_knowledge_base(&self.store, search).await
    }
}
