//! Prompt templates for the planner.

use crate::search::SearchResult;

/// The five sections every plan must cover.
pub const ANSWER_FACETS: [&str; 5] = [
    "约会主题和氛围建议",
    "具体活动安排",
    "时间规划建议",
    "地点推荐",
    "注意事项和贴心提示",
];

const ENRICHMENT_ASKS: [&str; 4] = [
    "具体的实施建议",
    "更多创意选择",
    "实用的注意事项",
    "个性化定制建议",
];

/// Placed between the original answer and its web-search enrichment.
pub const ENRICHMENT_SEPARATOR: &str = "\n\n💡 补充建议：\n";

/// Prefix of every degraded answer produced by the planner itself.
pub const ERROR_PREFIX: &str = "抱歉，规划约会时出现错误: ";

const TONE: &str = "请用温暖、专业的语气回答，确保建议实用且浪漫。";

fn numbered(items: &[&str]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| format!("{}. {}", idx + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt grounding the answer in retrieved knowledge.
pub fn retrieval_prompt(context: &str, query: &str) -> String {
    format!(
        "基于以下检索到的约会知识，为用户提供详细的约会规划：\n\n\
         检索到的知识：\n{}\n\n\
         用户需求：{}\n\n\
         请提供：\n{}\n\n{}",
        context,
        query,
        numbered(&ANSWER_FACETS),
        TONE
    )
}

/// Prompt asking the model to extend `original` using search snippets.
pub fn enrichment_prompt(original: &str, results: &[SearchResult]) -> String {
    let search_context = results
        .iter()
        .enumerate()
        .map(|(idx, result)| {
            format!(
                "搜索结果 {}:\n标题: {}\n内容: {}",
                idx + 1,
                result.title,
                result.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "基于以下搜索结果，请为原有的约会建议提供更详细、更实用的补充信息：\n\n\
         原有建议：\n{}\n\n\
         搜索结果：\n{}\n\n\
         请提供：\n{}\n\n\
         请保持温暖、专业的语气，确保建议实用且浪漫。",
        original,
        search_context,
        numbered(&ENRICHMENT_ASKS)
    )
}
