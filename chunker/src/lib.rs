//! Deterministic character-based document splitter (C5).

/// `max_chars` is the hard cut-off; `overlap_chars` is how much of the
/// tail of one chunk is repeated at the head of the next.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl ChunkConfig {
    #[must_use]
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            overlap_chars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_index: u32,
    pub text: String,
}

/// Fraction of `max_chars` searched backwards from a hard cut for a
/// paragraph or sentence boundary.
const LOOKBACK_FRACTION: usize = 5;

/// Splits `content` into ordered chunks. Operates on `char`s, not bytes,
/// so multi-byte characters are never split. `chunk_index` starts at 0
/// and is strictly increasing. Deterministic for a fixed `config`.
#[must_use]
pub fn chunk(content: &str, config: &ChunkConfig) -> Vec<Chunk> {
    let chars: Vec<char> = content.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let lookback = (config.max_chars / LOOKBACK_FRACTION).max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut chunk_index = 0u32;

    while start < chars.len() {
        let hard_end = (start + config.max_chars).min(chars.len());
        let end = if hard_end < chars.len() {
            find_boundary(&chars, start, hard_end, lookback).unwrap_or(hard_end)
        } else {
            hard_end
        };

        let text: String = chars[start..end].iter().collect();
        chunks.push(Chunk { chunk_index, text });
        chunk_index = chunk_index.saturating_add(1);

        if end >= chars.len() {
            break;
        }

        let next_start = end.saturating_sub(config.overlap_chars);
        start = if next_start > start { next_start } else { end };
    }

    chunks
}

/// Searches `[max(start, hard_end-lookback), hard_end)` for the last
/// paragraph break, falling back to the last sentence break. Returns the
/// index just after the boundary, i.e. a valid chunk end.
fn find_boundary(chars: &[char], start: usize, hard_end: usize, lookback: usize) -> Option<usize> {
    let window_start = hard_end.saturating_sub(lookback).max(start);
    if window_start >= hard_end {
        return None;
    }

    let window: String = chars[window_start..hard_end].iter().collect();

    if let Some(offset) = window.rfind("\n\n") {
        let boundary = window_start + window[..offset].chars().count() + 2;
        if boundary > start {
            return Some(boundary);
        }
    }

    for marker in [". ", "! ", "? ", "\n"] {
        if let Some(offset) = window.rfind(marker) {
            let boundary = window_start + window[..offset].chars().count() + marker.chars().count();
            if boundary > start {
                return Some(boundary);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_produces_no_chunks() {
        assert_eq!(chunk("", &ChunkConfig::new(100, 10)), Vec::new());
    }

    #[test]
    fn short_content_is_a_single_chunk() {
        let result = chunk("hello world", &ChunkConfig::new(100, 10));
        assert_eq!(result, vec![Chunk { chunk_index: 0, text: "hello world".to_string() }]);
    }

    #[test]
    fn chunk_indices_are_strictly_increasing() {
        let content = "a".repeat(500);
        let result = chunk(&content, &ChunkConfig::new(50, 5));
        let indices: Vec<u32> = result.iter().map(|c| c.chunk_index).collect();
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        assert_eq!(indices, sorted);
        for pair in indices.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn prefers_paragraph_boundary_over_hard_cut() {
        let content = format!("{}\n\n{}", "x".repeat(40), "y".repeat(40));
        let result = chunk(&content, &ChunkConfig::new(50, 0));
        assert_eq!(result[0].text, format!("{}\n\n", "x".repeat(40)));
    }

    #[test]
    fn falls_back_to_sentence_boundary() {
        let content = format!("{}. {}", "x".repeat(40), "y".repeat(40));
        let result = chunk(&content, &ChunkConfig::new(50, 0));
        assert_eq!(result[0].text, format!("{}. ", "x".repeat(40)));
    }

    #[test]
    fn falls_back_to_hard_cut_when_no_boundary_found() {
        let content = "z".repeat(200);
        let result = chunk(&content, &ChunkConfig::new(50, 0));
        assert_eq!(result[0].text, "z".repeat(50));
    }

    #[test]
    fn overlap_repeats_the_tail_of_the_previous_chunk() {
        let content = "z".repeat(200);
        let result = chunk(&content, &ChunkConfig::new(50, 10));
        let tail_of_first: String = result[0].text.chars().rev().take(10).collect::<String>().chars().rev().collect();
        let head_of_second: String = result[1].text.chars().take(10).collect();
        assert_eq!(tail_of_first, head_of_second);
    }

    #[test]
    fn is_deterministic_for_fixed_config() {
        let content = "The quick brown fox. It jumped over the lazy dog.\n\nA new paragraph starts here and continues for a while longer than the previous one did.";
        let config = ChunkConfig::new(40, 5);
        assert_eq!(chunk(content, &config), chunk(content, &config));
    }

    #[test]
    fn handles_multibyte_characters_without_panicking() {
        let content = "héllo wörld ".repeat(20);
        let result = chunk(&content, &ChunkConfig::new(30, 5));
        assert!(!result.is_empty());
        for c in &result {
            assert!(c.text.chars().count() <= 30);
        }
    }
}
