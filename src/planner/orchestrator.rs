//! The retrieval-augmentation loop.
//!
//! One request runs these stages in order:
//! 1. retrieve up to `top_k` chunks from the knowledge store
//! 2. generate, grounded in the chunks when there are any
//! 3. if the answer is shorter than `supplement_threshold` characters, run
//!    the dating-ideas web search and append an enrichment built from the
//!    top results
//!
//! Store and search failures arrive here as empty results and generation
//! failures as readable answers. Panics and the request timeout are caught at
//! [`DatingPlanner::plan`].

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{error, info, warn};

use super::prompts::{enrichment_prompt, retrieval_prompt, ENRICHMENT_SEPARATOR, ERROR_PREFIX};
use super::types::{AgentStatus, PlanningResult, SourceDocument};
use crate::core::config::RagConfig;
use crate::llm::GenerationService;
use crate::rag::{KnowledgeStore, StatValue};
use crate::search::SearchClient;

#[derive(Debug, Clone)]
pub struct PlannerOptions {
    pub top_k: usize,
    pub supplement_threshold: usize,
    pub supplement_results: usize,
    pub excerpt_chars: usize,
    pub request_timeout: Duration,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

impl PlannerOptions {
    pub fn from_config(rag: &RagConfig) -> Self {
        Self {
            top_k: rag.top_k,
            supplement_threshold: rag.supplement_threshold,
            supplement_results: rag.supplement_results,
            excerpt_chars: rag.excerpt_chars,
            request_timeout: Duration::from_secs(rag.request_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Retrieval,
    Generation,
    SupplementalSearch,
    Enrichment,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Retrieval => "retrieval",
            Stage::Generation => "generation",
            Stage::SupplementalSearch => "supplemental_search",
            Stage::Enrichment => "enrichment",
        }
    }
}

/// Last stage entered by a request, read back when it panics or times out.
struct StageTracker(Mutex<Stage>);

impl StageTracker {
    fn new() -> Self {
        Self(Mutex::new(Stage::Retrieval))
    }

    fn enter(&self, stage: Stage) {
        if let Ok(mut current) = self.0.lock() {
            *current = stage;
        }
    }

    fn current(&self) -> Stage {
        self.0.lock().map(|s| *s).unwrap_or(Stage::Retrieval)
    }
}

pub struct DatingPlanner {
    store: Arc<KnowledgeStore>,
    generator: GenerationService,
    search: Arc<SearchClient>,
    options: PlannerOptions,
}

impl DatingPlanner {
    pub fn new(
        store: Arc<KnowledgeStore>,
        generator: GenerationService,
        search: Arc<SearchClient>,
        options: PlannerOptions,
    ) -> Self {
        Self {
            store,
            generator,
            search,
            options,
        }
    }

    /// Answers `query`. Never fails; problems are described in `answer`.
    pub async fn plan(&self, query: &str) -> PlanningResult {
        info!(query, "Planning request received");
        let tracker = StageTracker::new();
        let work = std::panic::AssertUnwindSafe(self.run(query, &tracker)).catch_unwind();

        match tokio::time::timeout(self.options.request_timeout, work).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => {
                let stage = tracker.current().as_str();
                let message = panic_message(panic.as_ref());
                error!(stage, error = %message, "Planning aborted");
                PlanningResult::degraded(format!("{}{} ({})", ERROR_PREFIX, message, stage))
            }
            Err(_) => {
                let stage = tracker.current().as_str();
                let secs = self.options.request_timeout.as_secs_f32();
                warn!(stage, timeout_secs = secs, "Planning timed out");
                PlanningResult::degraded(format!(
                    "{}request timed out after {}s during {}",
                    ERROR_PREFIX, secs, stage
                ))
            }
        }
    }

    async fn run(&self, query: &str, tracker: &StageTracker) -> PlanningResult {
        tracker.enter(Stage::Retrieval);
        let chunks = self.store.search(query, self.options.top_k).await;

        tracker.enter(Stage::Generation);
        let (mut answer, source_documents, used_retrieval) = if chunks.is_empty() {
            info!("No knowledge retrieved; generating directly");
            (self.generator.generate(query).await, Vec::new(), false)
        } else {
            info!(chunks = chunks.len(), "Generating from retrieved knowledge");
            let context = chunks
                .iter()
                .map(|chunk| chunk.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            let answer = self
                .generator
                .generate(&retrieval_prompt(&context, query))
                .await;
            let documents = chunks
                .into_iter()
                .map(|chunk| SourceDocument {
                    content: excerpt(&chunk.content, self.options.excerpt_chars),
                    metadata: chunk.metadata,
                })
                .collect();
            (answer, documents, true)
        };

        let mut search_results = Vec::new();
        let answer_chars = answer.chars().count();
        if answer_chars < self.options.supplement_threshold {
            tracker.enter(Stage::SupplementalSearch);
            info!(
                answer_chars,
                threshold = self.options.supplement_threshold,
                "Answer under-detailed; supplementing with web search"
            );
            let mut found = self.search.search_dating_ideas(query).await;
            found.truncate(self.options.supplement_results);

            if !found.is_empty() {
                tracker.enter(Stage::Enrichment);
                match self
                    .generator
                    .try_generate(&enrichment_prompt(&answer, &found))
                    .await
                {
                    Ok(extra) => {
                        answer = format!("{}{}{}", answer, ENRICHMENT_SEPARATOR, extra);
                    }
                    Err(err) => {
                        warn!(error = %err, "Enrichment failed; keeping original answer");
                    }
                }
            }
            search_results = found;
        }

        info!(
            used_retrieval,
            sources = source_documents.len(),
            search_results = search_results.len(),
            "Planning complete"
        );
        PlanningResult {
            answer,
            source_documents,
            search_results,
            used_retrieval,
        }
    }

    pub async fn status(&self) -> AgentStatus {
        let vector_db_stats = self.store.stats().await;
        AgentStatus {
            llm_ready: self.generator.is_ready().await,
            rag_chain_ready: !matches!(vector_db_stats.document_count, StatValue::Error),
            vector_db_stats,
            model_info: self.generator.model_info(),
        }
    }
}

/// First `max_chars` characters followed by `...`, whether or not the text was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let cut = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(index, _)| index);
    format!("{}...", &text[..cut])
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unexpected panic".to_string()
    }
}
