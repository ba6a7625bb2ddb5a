//! First-run seeding of the knowledge store.

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::rag::{Chunk, KnowledgeStore, StatValue};
use crate::search::{SearchClient, SearchResult};

pub const SEED_TOPICS: [&str; 4] = ["七夕约会创意", "浪漫约会地点", "情侣约会活动", "约会礼物推荐"];

const RESULTS_PER_TOPIC: usize = 3;

const FUNDAMENTALS: &str = "七夕节是中国传统的情人节，起源于牛郎织女的美丽传说。这一天，情侣们会通过各种方式表达爱意，创造浪漫的回忆。

浪漫约会的基本要素：
1. 精心准备：提前规划，注意细节
2. 个性化：根据对方的喜好定制
3. 氛围营造：灯光、音乐、装饰等
4. 惊喜元素：意想不到的小惊喜
5. 情感表达：真诚的言语和行动";

const ACTIVITIES: &str = "经典约会活动推荐：
1. 烛光晚餐：选择浪漫餐厅，营造温馨氛围
2. 电影约会：选择爱情片或对方喜欢的类型
3. 户外活动：公园散步、野餐、看星星
4. 手工DIY：一起制作手工艺品或烹饪
5. 惊喜礼物：精心挑选有意义的礼物
6. 旅行约会：短途旅行，创造共同回忆";

const TIPS: &str = "约会注意事项：
1. 时间安排：合理安排时间，避免过于紧凑
2. 预算控制：根据经济能力制定计划
3. 天气考虑：关注天气预报，准备备选方案
4. 交通便利：选择交通便利的地点
5. 安全第一：注意人身和财产安全
6. 尊重对方：考虑对方的感受和意愿";

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    /// False when the store already had content or could not be counted.
    pub seeded: bool,
    pub baseline_chunks: usize,
    pub web_chunks: usize,
    pub errors: Vec<String>,
}

pub fn baseline_chunks() -> Vec<Chunk> {
    [
        (FUNDAMENTALS, "dating_fundamentals"),
        (ACTIVITIES, "dating_activities"),
        (TIPS, "dating_tips"),
    ]
    .into_iter()
    .map(|(content, category)| {
        Chunk::new(content)
            .with_meta("type", "basic_knowledge")
            .with_meta("category", category)
    })
    .collect()
}

pub fn search_result_chunk(result: &SearchResult) -> Chunk {
    Chunk::new(format!(
        "标题: {}\n\n内容: {}\n\n来源: {}",
        result.title, result.snippet, result.url
    ))
    .with_meta("type", "web_search")
    .with_meta("category", "dating_ideas")
    .with_meta("source", result.source.as_str())
    .with_meta("url", result.url.as_str())
    .with_meta("relevance_score", json!(result.relevance_score))
}

/// Seeds an empty store with baseline knowledge and, when `search` is given,
/// a web sweep over [`SEED_TOPICS`]. Does nothing unless the store is known
/// to be empty. Failures are logged and reported, never returned.
pub async fn seed_knowledge_base(store: &KnowledgeStore, search: Option<&SearchClient>) -> SeedReport {
    let mut report = SeedReport::default();

    match store.document_count().await {
        StatValue::Known(0) => {}
        StatValue::Known(count) => {
            info!(documents = count, "Knowledge store already populated; skipping seed");
            return report;
        }
        other => {
            warn!(count = ?other, "Could not determine knowledge store size; skipping seed");
            return report;
        }
    }

    info!("Knowledge store empty; seeding baseline knowledge");
    report.seeded = true;
    match store.add(baseline_chunks()).await {
        Ok(added) => report.baseline_chunks = added,
        Err(err) => {
            warn!(error = %err, "Failed to add baseline knowledge");
            report.errors.push(format!("baseline: {}", err));
        }
    }

    let Some(search) = search else {
        return report;
    };

    for topic in SEED_TOPICS {
        info!(topic, "Seeding from web search");
        let results = search.search_dating_ideas(topic).await;
        let chunks: Vec<Chunk> = results
            .iter()
            .take(RESULTS_PER_TOPIC)
            .map(search_result_chunk)
            .collect();
        if chunks.is_empty() {
            continue;
        }
        match store.add(chunks).await {
            Ok(added) => {
                info!(topic, added, "Added search results to knowledge store");
                report.web_chunks += added;
            }
            Err(err) => {
                warn!(topic, error = %err, "Failed to add search results");
                report.errors.push(format!("{}: {}", topic, err));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_has_three_categorised_chunks() {
        let chunks = baseline_chunks();
        assert_eq!(chunks.len(), 3);
        assert!(chunks
            .iter()
            .all(|c| c.metadata["type"] == "basic_knowledge"));
        assert_eq!(chunks[2].metadata["category"], "dating_tips");
    }

    #[test]
    fn search_result_chunk_keeps_provenance() {
        let chunk = search_result_chunk(&SearchResult {
            title: "七夕约会".into(),
            snippet: "去海边".into(),
            url: "https://x.example".into(),
            source: "baidu".into(),
            relevance_score: 6.5,
        });
        assert_eq!(chunk.content, "标题: 七夕约会\n\n内容: 去海边\n\n来源: https://x.example");
        assert_eq!(chunk.metadata["relevance_score"], 6.5);
        assert_eq!(chunk.metadata["url"], "https://x.example");
        let keys: Vec<&str> = chunk.metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, ["type", "category", "source", "url", "relevance_score"]);
    }
}
