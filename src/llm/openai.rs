use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::config::settings::RemoteLlmConfig;
use crate::core::errors::ApiError;

/// Remote OpenAI-compatible chat completion API.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    label: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: &RemoteLlmConfig, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = config
            .api_base
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .ok_or_else(|| ApiError::BadRequest("llm.remote.api_base is required".to_string()))?;
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ApiError::BadRequest("llm.remote.api_key is required".to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            label: config.provider.clone(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        if self.base_url.ends_with("/v1") {
            format!("{}/{}", self.base_url, path)
        } else {
            format!("{}/v1/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let res = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature.unwrap_or(self.temperature),
            "stream": false,
        });
        if let (Some(obj), Some(max_tokens)) = (body.as_object_mut(), request.max_tokens) {
            obj.insert("max_tokens".to_string(), json!(max_tokens));
        }

        let res = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "chat completion failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        extract_message(&payload)
    }

    fn model_info(&self) -> Value {
        json!({
            "type": "openai",
            "model": self.model,
            "api_base": self.base_url,
            "provider": self.label,
        })
    }
}

fn extract_message(payload: &Value) -> Result<String, ApiError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::Upstream("chat completion response has no choices[0].message.content".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(key: Option<&str>, base: Option<&str>) -> RemoteLlmConfig {
        RemoteLlmConfig {
            api_key: key.map(str::to_string),
            api_base: base.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn requires_credentials() {
        let timeout = Duration::from_secs(1);
        assert!(OpenAiProvider::new(&remote(None, Some("https://x")), timeout).is_err());
        assert!(OpenAiProvider::new(&remote(Some("k"), Some("  ")), timeout).is_err());
        assert!(OpenAiProvider::new(&remote(Some("k"), Some("https://x")), timeout).is_ok());
    }

    #[test]
    fn model_info_never_exposes_key() {
        let provider =
            OpenAiProvider::new(&remote(Some("sk-secret"), Some("https://api.example.com/v1/")), Duration::from_secs(1))
                .unwrap();
        let info = provider.model_info();

        assert_eq!(info["type"], "openai");
        assert_eq!(info["model"], "gpt-4o");
        assert_eq!(info["provider"], "ChatAnywhere");
        assert!(!info.to_string().contains("sk-secret"));
        assert_eq!(
            provider.endpoint("chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn unexpected_shape_is_an_error() {
        assert!(extract_message(&json!({ "error": "quota" })).is_err());
        assert_eq!(
            extract_message(&json!({ "choices": [{ "message": { "content": "hi" } }] })).unwrap(),
            "hi"
        );
    }
}
