use async_trait::async_trait;
use serde_json::Value;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name (e.g. "openai", "local")
    fn name(&self) -> &str;

    /// check if the backend is reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;

    /// backend identity for status pages; never includes credentials
    fn model_info(&self) -> Value;
}
