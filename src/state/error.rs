use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Invalid configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize knowledge store: {0}")]
    Rag(#[source] anyhow::Error),

    #[error("Failed to initialize LLM backend: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize search client: {0}")]
    Search(#[source] anyhow::Error),
}
