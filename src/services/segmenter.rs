//! Text segmenter.
//!
//! Splits raw text (documents, scraped pages, conversation exchanges)
//! into bounded chunks suitable for embedding. Pure and deterministic:
//! identical input and parameters always produce identical chunks.
//!
//! Splitting prefers paragraph boundaries, then sentence boundaries, and
//! only falls back to hard character splitting when a single sentence
//! exceeds the chunk budget.

use crate::domain::errors::{KnowledgeError, KnowledgeResult};
use crate::domain::models::SegmenterConfig;

/// Stateless segmenter parameterized by chunk size and overlap.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            config: SegmenterConfig::default(),
        }
    }
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> KnowledgeResult<Self> {
        if config.max_chars == 0 {
            return Err(KnowledgeError::ValidationFailed(
                "segmenter max_chars must be greater than 0".to_string(),
            ));
        }
        if config.overlap >= config.max_chars {
            return Err(KnowledgeError::ValidationFailed(format!(
                "segmenter overlap ({}) must be less than max_chars ({})",
                config.overlap, config.max_chars
            )));
        }
        Ok(Self { config })
    }

    pub fn max_chars(&self) -> usize {
        self.config.max_chars
    }

    /// Split text into trimmed, non-empty chunks of at most `max_chars`
    /// characters each.
    ///
    /// Empty or whitespace-only input yields an empty vec: "nothing to
    /// ingest", not a fault.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let max_chars = self.config.max_chars;
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();

        for unit in split_units(text, max_chars) {
            if current.is_empty() {
                current = unit;
                continue;
            }
            // +1 for the joining space
            if current.chars().count() + 1 + unit.chars().count() <= max_chars {
                current.push(' ');
                current.push_str(&unit);
            } else {
                chunks.push(current);
                current = self.seed_with_overlap(chunks.last().unwrap(), &unit);
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Start the next chunk, optionally carrying trailing context from
    /// the previous chunk for continuity across boundaries.
    fn seed_with_overlap(&self, previous: &str, unit: &str) -> String {
        if self.config.overlap == 0 {
            return unit.to_string();
        }
        let tail = tail_chars(previous, self.config.overlap);
        let budget = self.config.max_chars;
        // Only prepend the overlap if the unit still fits afterwards
        if tail.chars().count() + 1 + unit.chars().count() <= budget {
            format!("{} {}", tail.trim(), unit)
        } else {
            unit.to_string()
        }
    }
}

/// Break text into units no larger than `max_chars`: paragraphs, then
/// sentences, then hard character slices as the last resort.
fn split_units(text: &str, max_chars: usize) -> Vec<String> {
    let mut units = Vec::new();
    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if paragraph.chars().count() <= max_chars {
            units.push(paragraph.to_string());
            continue;
        }
        for sentence in split_sentences(paragraph) {
            if sentence.chars().count() <= max_chars {
                units.push(sentence);
            } else {
                units.extend(hard_split(&sentence, max_chars));
            }
        }
    }
    units
}

/// Split a paragraph on sentence-ending punctuation followed by
/// whitespace. Keeps the punctuation with its sentence.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = paragraph.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }
    let sentence = current.trim().to_string();
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
    sentences
}

/// Hard character split on char boundaries, preferring to break at the
/// last whitespace inside the window.
fn hard_split(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        if end == chars.len() {
            pieces.push(window.trim().to_string());
            break;
        }
        // Break at the last whitespace in the window when one exists
        let cut = window
            .char_indices()
            .filter(|(_, c)| c.is_whitespace())
            .map(|(i, _)| i)
            .next_back();
        match cut {
            Some(byte_idx) if byte_idx > 0 => {
                let piece = window[..byte_idx].trim().to_string();
                let consumed = window[..byte_idx].chars().count() + 1;
                if !piece.is_empty() {
                    pieces.push(piece);
                }
                start += consumed.max(1);
            }
            _ => {
                pieces.push(window.trim().to_string());
                start = end;
            }
        }
    }

    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Last `n` characters of a string, starting at a word boundary where
/// possible.
fn tail_chars(text: &str, n: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= n {
        return text.to_string();
    }
    let tail: String = chars[chars.len() - n..].iter().collect();
    // Drop a leading partial word
    match tail.find(char::is_whitespace) {
        Some(idx) => tail[idx..].trim().to_string(),
        None => tail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter(max_chars: usize, overlap: usize) -> Segmenter {
        Segmenter::new(SegmenterConfig { max_chars, overlap }).unwrap()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let seg = segmenter(100, 0);
        assert!(seg.segment("").is_empty());
        assert!(seg.segment("   \n\n\t  ").is_empty());
    }

    #[test]
    fn test_short_input_is_one_chunk() {
        let seg = segmenter(100, 0);
        let chunks = seg.segment("  Our store opens at 9am.  ");
        assert_eq!(chunks, vec!["Our store opens at 9am."]);
    }

    #[test]
    fn test_3000_chars_with_max_1500() {
        let seg = segmenter(1500, 0);
        let sentence = "Our refund policy covers all purchases made in the last thirty days. ";
        let mut text = String::new();
        while text.len() < 3000 {
            text.push_str(sentence);
        }

        let chunks = seg.segment(&text);
        assert!(chunks.len() >= 2, "expected >=2 chunks, got {}", chunks.len());
        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.chars().count() <= 1500, "chunk exceeds max_chars");
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let seg = segmenter(40, 0);
        let chunks = seg.segment("First paragraph here.\n\nSecond paragraph here.");
        assert_eq!(
            chunks,
            vec!["First paragraph here.", "Second paragraph here."]
        );
    }

    #[test]
    fn test_sentence_split_when_paragraph_too_long() {
        let seg = segmenter(30, 0);
        let chunks = seg.segment("One short sentence. Another short sentence.");
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].ends_with('.'));
    }

    #[test]
    fn test_hard_split_for_unbroken_text() {
        let seg = segmenter(10, 0);
        let chunks = seg.segment(&"x".repeat(35));
        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
    }

    #[test]
    fn test_hard_split_is_char_boundary_safe() {
        let seg = segmenter(5, 0);
        let chunks = seg.segment(&"é".repeat(12));
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 5);
        }
    }

    #[test]
    fn test_deterministic() {
        let seg = segmenter(50, 10);
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota kappa lambda mu.";
        assert_eq!(seg.segment(text), seg.segment(text));
    }

    #[test]
    fn test_overlap_carries_trailing_context() {
        let seg = segmenter(40, 12);
        let chunks = seg.segment("First sentence goes here. Then more text.");
        assert!(chunks.len() >= 2);
        // The second chunk starts with context carried from the first
        let first_tail: Vec<&str> = chunks[0].split_whitespace().collect();
        let last_word = first_tail.last().unwrap();
        assert!(
            chunks[1].contains(last_word),
            "expected overlap from {:?} in {:?}",
            chunks[0],
            chunks[1]
        );
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Segmenter::new(SegmenterConfig { max_chars: 0, overlap: 0 }).is_err());
        assert!(Segmenter::new(SegmenterConfig { max_chars: 10, overlap: 10 }).is_err());
    }
}
