use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{RawHit, SearchBackend};
use crate::core::errors::ApiError;

const API_URL: &str = "https://api.duckduckgo.com/";

/// DuckDuckGo instant-answer API. Returns the abstract plus related topics.
pub struct DuckDuckGoBackend {
    client: Client,
}

impl DuckDuckGoBackend {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, ApiError> {
        let url = format!(
            "{}?q={}&format=json&no_redirect=1&no_html=1",
            API_URL,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "DuckDuckGo search failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::upstream)?;
        let mut hits = parse_payload(&payload);
        hits.truncate(max_results);
        Ok(hits)
    }
}

fn parse_payload(payload: &Value) -> Vec<RawHit> {
    let mut hits = Vec::new();

    let abstract_text = payload
        .get("AbstractText")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let abstract_url = payload
        .get("AbstractURL")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if !abstract_text.is_empty() && !abstract_url.is_empty() {
        let heading = payload
            .get("Heading")
            .and_then(|v| v.as_str())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| abstract_text.split(" - ").next().unwrap_or(abstract_text));
        hits.push(RawHit {
            title: heading.to_string(),
            snippet: abstract_text.to_string(),
            url: abstract_url.to_string(),
            source: "duckduckgo".to_string(),
        });
    }

    for key in ["Results", "RelatedTopics"] {
        if let Some(items) = payload.get(key).and_then(|v| v.as_array()) {
            collect_topics(items, &mut hits);
        }
    }

    hits
}

fn collect_topics(items: &[Value], hits: &mut Vec<RawHit>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            collect_topics(topics, hits);
            continue;
        }
        let text = item.get("Text").and_then(|v| v.as_str()).unwrap_or("");
        let url = item.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        hits.push(RawHit {
            title: text.split(" - ").next().unwrap_or(text).to_string(),
            snippet: text.to_string(),
            url: url.to_string(),
            source: "duckduckgo".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_abstract_and_nested_topics() {
        let payload = json!({
            "Heading": "七夕",
            "AbstractText": "七夕节是中国传统的情人节",
            "AbstractURL": "https://ddg.example/qixi",
            "RelatedTopics": [
                { "Text": "浪漫约会 - 创意合集", "FirstURL": "https://ddg.example/a" },
                { "Name": "More", "Topics": [
                    { "Text": "情侣活动", "FirstURL": "https://ddg.example/b" },
                    { "Text": "", "FirstURL": "https://ddg.example/empty" }
                ]}
            ]
        });

        let hits = parse_payload(&payload);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "七夕");
        assert_eq!(hits[1].title, "浪漫约会");
        assert_eq!(hits[2].url, "https://ddg.example/b");
        assert!(hits.iter().all(|h| h.source == "duckduckgo"));
    }
}
