//! Domain relevance filter and scoring for search hits.

use std::sync::OnceLock;

use regex::Regex;

use super::{RawHit, SearchResult};

pub const DATING_KEYWORDS: [&str; 17] = [
    "约会",
    "浪漫",
    "情侣",
    "七夕",
    "情人节",
    "爱情",
    "恋爱",
    "餐厅",
    "电影",
    "礼物",
    "惊喜",
    "烛光晚餐",
    "花束",
    "约会地点",
    "约会活动",
    "约会攻略",
    "约会建议",
];

/// (keyword, title weight, snippet weight)
const SCORE_TIERS: [(&str, f64, f64); 4] = [
    ("约会", 3.0, 2.0),
    ("七夕", 2.5, 1.5),
    ("浪漫", 2.0, 1.0),
    ("情侣", 1.5, 1.0),
];

const TRUSTED_SOURCES: [&str; 2] = ["baidu", "duckduckgo"];
const TRUSTED_SOURCE_BONUS: f64 = 0.5;

/// Case-insensitive keyword match on title or snippet.
pub fn is_relevant(hit: &RawHit) -> bool {
    let title = hit.title.to_lowercase();
    let snippet = hit.snippet.to_lowercase();
    DATING_KEYWORDS
        .iter()
        .any(|keyword| title.contains(keyword) || snippet.contains(keyword))
}

pub fn relevance_score(hit: &RawHit) -> f64 {
    let title = hit.title.to_lowercase();
    let snippet = hit.snippet.to_lowercase();

    let mut score = 0.0;
    for (keyword, title_weight, snippet_weight) in SCORE_TIERS {
        if title.contains(keyword) {
            score += title_weight;
        }
        if snippet.contains(keyword) {
            score += snippet_weight;
        }
    }
    if TRUSTED_SOURCES.contains(&hit.source.as_str()) {
        score += TRUSTED_SOURCE_BONUS;
    }
    score
}

/// Strips markup, collapses whitespace and drops punctuation, keeping word
/// characters and CJK ideographs.
pub fn clean_text(text: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static SYMBOLS: OnceLock<Regex> = OnceLock::new();

    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("static pattern"));
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("static pattern"));
    let symbols = SYMBOLS
        .get_or_init(|| Regex::new(r"[^\w\s\x{4e00}-\x{9fff}]").expect("static pattern"));

    let text = tags.replace_all(text, "");
    let text = spaces.replace_all(&text, " ");
    let text = symbols.replace_all(&text, "");
    text.trim().to_string()
}

/// Filters, cleans and scores one hit. Hits whose title or snippet is
/// empty after cleaning are dropped.
pub fn to_result(hit: &RawHit) -> Option<SearchResult> {
    if !is_relevant(hit) {
        return None;
    }
    let title = clean_text(&hit.title);
    let snippet = clean_text(&hit.snippet);
    if title.is_empty() || snippet.is_empty() {
        return None;
    }

    Some(SearchResult {
        title,
        snippet,
        url: hit.url.clone(),
        source: if hit.source.is_empty() {
            "unknown".to_string()
        } else {
            hit.source.clone()
        },
        relevance_score: relevance_score(hit),
    })
}
