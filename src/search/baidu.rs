use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::{RawHit, SearchBackend};
use crate::core::errors::ApiError;

const SEARCH_URL: &str = "https://www.baidu.com/s";
const MISSING_SNIPPET: &str = "暂无摘要";
const FALLBACK_MIN_TITLE_CHARS: usize = 5;
const FALLBACK_SNIPPET_CHARS: usize = 200;

/// Scrapes the Baidu results page.
pub struct BaiduBackend {
    client: Client,
}

impl BaiduBackend {
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
impl SearchBackend for BaiduBackend {
    fn name(&self) -> &str {
        "baidu"
    }

    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, ApiError> {
        let url = format!(
            "{}?wd={}&rn={}",
            SEARCH_URL,
            urlencoding::encode(query),
            max_results
        );
        debug!(%url, "Baidu search");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ApiError::upstream)?;
        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "Baidu search failed: {}",
                response.status()
            )));
        }
        let html = response.text().await.map_err(ApiError::upstream)?;

        let hits = parse_results(&html, max_results);
        info!(hits = hits.len(), "Baidu search parsed");
        Ok(hits)
    }
}

/// Parses result blocks, falling back to a looser scan when the standard
/// layout yields nothing.
pub(crate) fn parse_results(html: &str, max_results: usize) -> Vec<RawHit> {
    let document = Html::parse_document(html);
    let hits = parse_standard(&document, max_results);
    if !hits.is_empty() {
        return hits;
    }
    debug!("Standard Baidu layout not found; trying fallback parse");
    parse_fallback(&document, max_results)
}

fn parse_standard(document: &Html, max_results: usize) -> Vec<RawHit> {
    let (Ok(block_sel), Ok(title_sel), Ok(link_sel), Ok(abstract_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("h3"),
        Selector::parse("a"),
        Selector::parse("div.c-abstract"),
    ) else {
        return Vec::new();
    };

    let mut hits = Vec::new();
    for block in document.select(&block_sel).take(max_results) {
        let Some(title_el) = block.select(&title_sel).next() else {
            continue;
        };
        let Some(link_el) = title_el.select(&link_sel).next() else {
            continue;
        };
        let title = stripped_text(&title_el);
        let url = link_el.value().attr("href").unwrap_or_default().to_string();
        let snippet = block
            .select(&abstract_sel)
            .next()
            .map(|el| stripped_text(&el))
            .unwrap_or_else(|| MISSING_SNIPPET.to_string());

        if !title.is_empty() && !snippet.is_empty() {
            hits.push(RawHit {
                title,
                snippet,
                url,
                source: "baidu".to_string(),
            });
        }
    }
    hits
}

fn parse_fallback(document: &Html, max_results: usize) -> Vec<RawHit> {
    let (Ok(div_sel), Ok(title_sel), Ok(link_sel)) = (
        Selector::parse("div[class]"),
        Selector::parse("h3, h2, a"),
        Selector::parse("a"),
    ) else {
        return Vec::new();
    };
    let snippet_sels: Vec<Selector> = [".c-abstract", ".content", "p", ".summary"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect();

    let candidates = document.select(&div_sel).filter(|el| {
        el.value()
            .classes()
            .any(|class| class.contains("result") || class.contains("c-container"))
    });

    let mut hits = Vec::new();
    for block in candidates.take(max_results) {
        let Some(title_el) = block.select(&title_sel).next() else {
            continue;
        };
        let title = stripped_text(&title_el);
        let title_chars = title.chars().count();
        if title_chars < FALLBACK_MIN_TITLE_CHARS {
            continue;
        }

        let url = block
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default()
            .to_string();

        let mut snippet = snippet_sels
            .iter()
            .find_map(|sel| block.select(sel).next())
            .map(|el| stripped_text(&el))
            .unwrap_or_default();
        if snippet.is_empty() {
            let whole = stripped_text(&block);
            if whole.chars().count() > title_chars {
                snippet = whole.chars().take(FALLBACK_SNIPPET_CHARS).collect::<String>() + "...";
            }
        }

        if !snippet.is_empty() {
            hits.push(RawHit {
                title,
                snippet,
                url,
                source: "baidu_fallback".to_string(),
            });
        }
    }
    hits
}

/// Concatenates the element's text nodes, each trimmed.
fn stripped_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STANDARD_PAGE: &str = r#"
        <html><body>
          <div class="result c-container">
            <h3><a href="https://a.example/1"><em>七夕</em>约会攻略</a></h3>
            <div class="c-abstract">十个浪漫的约会点子</div>
          </div>
          <div class="result">
            <h3><a href="https://a.example/2">情侣餐厅推荐</a></h3>
          </div>
          <div class="result">
            <h3>没有链接的标题</h3>
          </div>
        </body></html>
    "#;

    const FALLBACK_PAGE: &str = r#"
        <html><body>
          <div class="c-container new-pmd">
            <h2>海边约会的十个建议</h2>
            <a href="https://b.example/beach">link</a>
            <p>带上野餐垫，一起看日落。</p>
          </div>
          <div class="result-op">
            <h3>短标题</h3>
            <p>会被跳过</p>
          </div>
          <div class="c-container">
            <h3>没有摘要的结果块</h3>
            <span>只有正文文本可以用作摘要</span>
          </div>
        </body></html>
    "#;

    #[test]
    fn parses_standard_result_blocks() {
        let hits = parse_results(STANDARD_PAGE, 10);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "七夕约会攻略");
        assert_eq!(hits[0].url, "https://a.example/1");
        assert_eq!(hits[0].snippet, "十个浪漫的约会点子");
        assert_eq!(hits[0].source, "baidu");
        assert_eq!(hits[1].snippet, MISSING_SNIPPET);
    }

    #[test]
    fn respects_max_results() {
        assert_eq!(parse_results(STANDARD_PAGE, 1).len(), 1);
    }

    #[test]
    fn falls_back_when_standard_layout_is_missing() {
        let hits = parse_results(FALLBACK_PAGE, 10);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "海边约会的十个建议");
        assert_eq!(hits[0].url, "https://b.example/beach");
        assert_eq!(hits[0].snippet, "带上野餐垫，一起看日落。");
        assert_eq!(hits[0].source, "baidu_fallback");
        assert!(hits[1].snippet.ends_with("..."));
        assert!(hits[1].snippet.contains("只有正文文本"));
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(parse_results("<html></html>", 5).is_empty());
    }
}
