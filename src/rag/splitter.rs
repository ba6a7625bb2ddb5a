//! Recursive character splitter.
//!
//! Text is split on the coarsest separator present (paragraph, line, word,
//! character), oversized pieces are re-split with the finer separators, and
//! the small pieces are merged back into fragments of at most `chunk_size`
//! characters, each new fragment re-using up to `chunk_overlap` trailing
//! characters of the previous one.

use std::collections::VecDeque;

use super::store::Chunk;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    /// Re-splits every chunk longer than `chunk_size`, copying its metadata to
    /// each fragment. Blank chunks are dropped.
    pub fn split_chunks(&self, chunks: Vec<Chunk>) -> Vec<Chunk> {
        let mut out = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if chunk.content.trim().is_empty() {
                continue;
            }
            if char_len(&chunk.content) <= self.chunk_size {
                out.push(chunk);
                continue;
            }
            for fragment in self.split_text(&chunk.content) {
                out.push(Chunk {
                    content: fragment,
                    metadata: chunk.metadata.clone(),
                });
            }
        }
        out
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut finer: &[&str] = &[];
        for (idx, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                finer = &separators[idx + 1..];
                break;
            }
        }

        let mut fragments = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                fragments.extend(self.merge_pieces(&pending));
                pending.clear();
            }
            if finer.is_empty() {
                fragments.push(piece.to_string());
            } else {
                fragments.extend(self.split_recursive(piece, finer));
            }
        }
        if !pending.is_empty() {
            fragments.extend(self.merge_pieces(&pending));
        }
        fragments
    }

    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut fragments = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(fragment) = join_window(&window) {
                    fragments.push(fragment);
                }
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some(first) => total -= char_len(first),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        if let Some(fragment) = join_window(&window) {
            fragments.push(fragment);
        }
        fragments
    }
}

/// Splits `text` so each separator occurrence starts the following piece.
/// An empty separator splits into characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(idx, c)| &text[idx..idx + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn join_window(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_fragment() {
        let splitter = RecursiveTextSplitter::new(100, 20);
        assert_eq!(splitter.split_text("  海边看日落  "), vec!["海边看日落".to_string()]);
    }

    #[test]
    fn separator_starts_next_piece() {
        assert_eq!(
            split_keeping_separator("a b  c", " "),
            vec!["a", " b", " ", " c"]
        );
        assert_eq!(split_keeping_separator("七夕", ""), vec!["七", "夕"]);
    }

    #[test]
    fn paragraphs_respect_size_bound() {
        let text = (0..12)
            .map(|i| format!("第{}段：浪漫的约会需要用心准备 and some words here", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let splitter = RecursiveTextSplitter::new(50, 10);
        let fragments = splitter.split_text(&text);

        assert!(fragments.len() > 1);
        assert!(fragments.iter().all(|f| char_len(f) <= 50));
    }

    #[test]
    fn consecutive_word_fragments_overlap() {
        let text = (1..=60).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let splitter = RecursiveTextSplitter::new(30, 10);
        let fragments = splitter.split_text(&text);

        assert!(fragments.len() > 2);
        for pair in fragments.windows(2) {
            assert!(char_len(&pair[0]) <= 30);
            let first_word = pair[1].split(' ').next().unwrap();
            assert!(
                pair[0].split(' ').any(|w| w == first_word),
                "{:?} should start inside {:?}",
                pair[1],
                pair[0]
            );
        }
    }

    #[test]
    fn unbroken_cjk_text_falls_back_to_characters() {
        let text = "七夕约会".repeat(625);
        let splitter = RecursiveTextSplitter::new(1000, 200);
        let fragments = splitter.split_text(&text);

        assert_eq!(char_len(&fragments[0]), 1000);
        assert!(fragments.iter().all(|f| char_len(f) <= 1000));
        let tail: String = fragments[0].chars().skip(800).collect();
        let head: String = fragments[1].chars().take(200).collect();
        assert_eq!(tail, head);
    }

    #[test]
    fn split_chunks_copies_metadata_and_drops_blank() {
        let splitter = RecursiveTextSplitter::new(20, 5);
        let chunks = vec![
            Chunk::new("one two three four five six seven eight nine").with_meta("type", "t"),
            Chunk::new("   "),
            Chunk::new("short"),
        ];
        let out = splitter.split_chunks(chunks);

        assert!(out.len() >= 3);
        assert_eq!(out.last().unwrap().content, "short");
        assert!(out[..out.len() - 1]
            .iter()
            .all(|c| c.metadata.get("type").and_then(|v| v.as_str()) == Some("t")));
    }
}
