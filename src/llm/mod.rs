//! Text generation: provider backends and the generation service.

pub mod local;
pub mod openai;
pub mod provider;
pub mod service;
pub mod types;

use std::sync::Arc;

use tracing::info;

use crate::core::config::{LlmBackend, LlmConfig};
use crate::core::errors::ApiError;

pub use local::LocalCompletionProvider;
pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use service::GenerationService;
pub use types::{ChatMessage, ChatRequest};

/// Builds the provider selected by `llm.backend`.
pub fn build_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, ApiError> {
    match config.resolve_backend()? {
        LlmBackend::Remote => {
            info!(model = %config.remote.model, "Using remote chat completion API");
            Ok(Arc::new(OpenAiProvider::new(&config.remote, config.timeout())?))
        }
        LlmBackend::Local | LlmBackend::Auto => {
            info!(
                model = %config.local.model_name,
                base_url = %config.local.base_url,
                "Using local completion server"
            );
            Ok(Arc::new(LocalCompletionProvider::new(&config.local, config.timeout())?))
        }
    }
}
