use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::config::settings::LocalLlmConfig;
use crate::core::errors::ApiError;

/// Marker that ends a rendered local prompt; the model continues after it.
pub const ANSWER_MARKER: &str = "约会规划师:";

/// Local inference server speaking the llama.cpp `/completion` protocol.
#[derive(Clone)]
pub struct LocalCompletionProvider {
    base_url: String,
    config: LocalLlmConfig,
    client: Client,
}

impl LocalCompletionProvider {
    pub fn new(config: &LocalLlmConfig, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            client,
        })
    }
}

/// Flattens chat messages into the raw completion prompt.
pub fn render_prompt(request: &ChatRequest) -> String {
    let system = request.content_of("system");
    let user = request.content_of("user");
    if system.is_empty() {
        format!("{}\n\n{}", user, ANSWER_MARKER)
    } else {
        format!("{}\n\n{}\n\n{}", system, user, ANSWER_MARKER)
    }
}

#[async_trait]
impl LlmProvider for LocalCompletionProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let url = format!("{}/completion", self.base_url);
        let body = json!({
            "prompt": render_prompt(&request),
            "n_predict": request.max_tokens.unwrap_or(self.config.max_new_tokens),
            "temperature": request.temperature.unwrap_or(self.config.temperature),
            "top_p": self.config.top_p,
            "repeat_penalty": self.config.repeat_penalty,
            "stream": false,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!("local completion error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        payload["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Upstream("local completion response has no content".to_string()))
    }

    fn model_info(&self) -> Value {
        json!({
            "type": "local",
            "model_name": self.config.model_name,
            "base_url": self.base_url,
            "max_new_tokens": self.config.max_new_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    #[test]
    fn renders_persona_request_and_marker() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("你是规划师"),
            ChatMessage::user("用户需求: 海边"),
        ]);
        assert_eq!(render_prompt(&request), "你是规划师\n\n用户需求: 海边\n\n约会规划师:");
    }

    #[test]
    fn model_info_reports_local_model() {
        let provider =
            LocalCompletionProvider::new(&LocalLlmConfig::default(), Duration::from_secs(1)).unwrap();
        let info = provider.model_info();
        assert_eq!(info["type"], "local");
        assert_eq!(info["model_name"], "meta-llama/Llama-2-7b-chat-hf");
        assert_eq!(info["max_new_tokens"], 512);
    }
}
