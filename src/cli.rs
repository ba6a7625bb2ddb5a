//! Interactive terminal front end over [`DatingPlanner::plan`].

use std::fmt::Write as _;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use crate::planner::{DatingPlanner, PlanningResult};

const EXIT_WORDS: [&str; 3] = ["quit", "exit", "退出"];
const PROMPT: &str = "\n💕 请描述你的约会需求: ";
const PREVIEW_ITEMS: usize = 2;
const PREVIEW_CHARS: usize = 100;
const RULE: &str = "==================================================";

/// Runs the REPL on stdin/stdout until an exit word or EOF.
pub async fn run_repl(planner: &DatingPlanner) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let mut writer = tokio::io::stdout();
    run_session(planner, reader, &mut writer).await
}

pub async fn run_session<R, W>(planner: &DatingPlanner, reader: R, writer: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Interactive mode started; type 'quit' or 'exit' to leave");
    let mut lines = reader.lines();

    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if is_exit_command(input) {
            writer.write_all("再见！💕\n".as_bytes()).await?;
            break;
        }
        if input.is_empty() {
            continue;
        }

        let result = planner.plan(input).await;
        writer.write_all(render_result(&result).as_bytes()).await?;
        writer.flush().await?;
    }

    writer.flush().await?;
    Ok(())
}

pub fn is_exit_command(input: &str) -> bool {
    let lowered = input.trim().to_lowercase();
    EXIT_WORDS.iter().any(|word| *word == lowered)
}

pub fn render_result(result: &PlanningResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{RULE}\n💡 约会规划建议:\n{RULE}");
    let _ = writeln!(out, "{}", result.answer);

    if !result.source_documents.is_empty() {
        let _ = writeln!(out, "\n📚 参考信息:");
        for (index, doc) in result.source_documents.iter().take(PREVIEW_ITEMS).enumerate() {
            let _ = writeln!(out, "来源 {}: {}", index + 1, preview(&doc.content));
        }
    }

    if !result.search_results.is_empty() {
        let _ = writeln!(out, "\n🌐 网络搜索结果:");
        for (index, hit) in result.search_results.iter().take(PREVIEW_ITEMS).enumerate() {
            let _ = writeln!(out, "结果 {}: {}", index + 1, hit.title);
            let _ = writeln!(out, "       {}", preview(&hit.snippet));
        }
    }

    let _ = writeln!(out, "{RULE}");
    out
}

fn preview(text: &str) -> String {
    crate::planner::orchestrator::excerpt(text, PREVIEW_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::SourceDocument;
    use crate::search::SearchResult;
    use serde_json::Map;

    #[test]
    fn exit_words_are_case_insensitive() {
        assert!(is_exit_command("quit"));
        assert!(is_exit_command("  EXIT "));
        assert!(is_exit_command("退出"));
        assert!(!is_exit_command("quite a plan"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn render_limits_previews_to_two_items() {
        let doc = |content: &str| SourceDocument {
            content: content.to_string(),
            metadata: Map::new(),
        };
        let hit = |title: &str| SearchResult {
            title: title.to_string(),
            snippet: "海边 ".repeat(80),
            url: format!("https://example.com/{title}"),
            source: "baidu".to_string(),
            relevance_score: 2.0,
        };
        let result = PlanningResult {
            answer: "去海边看日落".to_string(),
            source_documents: vec![doc("第一条"), doc("第二条"), doc("第三条")],
            search_results: vec![hit("一"), hit("二"), hit("三")],
            used_retrieval: true,
        };

        let rendered = render_result(&result);

        assert!(rendered.contains("去海边看日落"));
        assert!(rendered.contains("来源 2: 第二条"));
        assert!(!rendered.contains("第三条"));
        assert!(rendered.contains("结果 2: 二"));
        assert!(!rendered.contains("结果 3"));
        assert!(rendered.contains("..."));
    }

    #[test]
    fn render_skips_empty_sections() {
        let rendered = render_result(&PlanningResult::degraded("生成失败: offline".to_string()));
        assert!(rendered.contains("生成失败"));
        assert!(!rendered.contains("参考信息"));
        assert!(!rendered.contains("网络搜索结果"));
    }
}
