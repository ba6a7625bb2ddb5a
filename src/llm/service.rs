use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::local::ANSWER_MARKER;
use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest};
use crate::core::errors::ApiError;

/// Persona preamble sent with every generation.
pub const PERSONA: &str = "你是一个专业的七夕约会规划师，擅长为情侣提供浪漫、有趣、个性化的约会建议。

你的任务是根据用户的需求，提供详细的约会规划，包括：
1. 约会主题和氛围
2. 具体活动安排
3. 时间规划
4. 地点推荐
5. 注意事项和建议

请用温暖、专业的语气回答，确保建议实用且浪漫。";

const USER_PREFIX: &str = "用户需求: ";
const FAILURE_PREFIX: &str = "生成失败";

/// Uniform `generate(prompt) -> text` over any [`LlmProvider`].
#[derive(Clone)]
pub struct GenerationService {
    provider: Arc<dyn LlmProvider>,
}

impl GenerationService {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Like [`try_generate`](Self::try_generate) but never fails: errors are
    /// returned as a readable answer.
    pub async fn generate(&self, prompt: &str) -> String {
        match self.try_generate(prompt).await {
            Ok(text) => text,
            Err(err) => {
                warn!(provider = self.provider.name(), error = %err, "Generation failed");
                format!("{}: {}", FAILURE_PREFIX, err)
            }
        }
    }

    pub async fn try_generate(&self, prompt: &str) -> Result<String, ApiError> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(PERSONA),
            ChatMessage::user(format!("{}{}", USER_PREFIX, prompt)),
        ]);

        let raw = self.provider.chat(request).await?;
        let cleaned = strip_echo(&raw, prompt);
        info!(
            provider = self.provider.name(),
            chars = cleaned.chars().count(),
            "Generation complete"
        );
        Ok(cleaned)
    }

    /// Backend reachability; any error counts as not ready.
    pub async fn is_ready(&self) -> bool {
        match self.provider.health_check().await {
            Ok(ready) => ready,
            Err(err) => {
                warn!(provider = self.provider.name(), error = %err, "Health check failed");
                false
            }
        }
    }

    pub fn model_info(&self) -> Value {
        self.provider.model_info()
    }
}

/// Removes an echoed prompt or persona from the front of `response`.
///
/// Prefixes are stripped repeatedly until none matches, so applying this to
/// its own output changes nothing.
pub fn strip_echo(response: &str, prompt: &str) -> String {
    let user_line = format!("{}{}", USER_PREFIX, prompt);
    let rendered = format!("{}\n\n{}\n\n{}", PERSONA, user_line, ANSWER_MARKER);
    let prefixes = [
        rendered.as_str(),
        PERSONA,
        user_line.as_str(),
        ANSWER_MARKER,
        "约会规划师：",
    ];

    let mut text = response.trim();
    loop {
        let before = text.len();
        for prefix in prefixes.iter().filter(|p| !p.is_empty()) {
            if let Some(rest) = text.strip_prefix(prefix) {
                text = rest.trim_start();
            }
        }
        if let Some(rest) = strip_bare_prompt(text, prompt.trim()) {
            text = rest;
        }
        if text.len() == before {
            break;
        }
    }
    text.trim_end().to_string()
}

/// Drops an echoed prompt only when it stands on its own line or precedes the
/// answer marker, so answers that merely start with the query words survive.
fn strip_bare_prompt<'a>(text: &'a str, prompt: &str) -> Option<&'a str> {
    if prompt.is_empty() {
        return None;
    }
    let rest = text.strip_prefix(prompt)?;
    let after = rest.trim_start_matches([' ', '\t']);
    if after.starts_with(['\n', '\r'])
        || after.starts_with(ANSWER_MARKER)
        || after.starts_with("约会规划师：")
    {
        Some(rest.trim_start())
    } else {
        None
    }
}
