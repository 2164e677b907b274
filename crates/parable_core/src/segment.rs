//! Sentence-based narration segmenter.

use crate::{Segment, TextSegmenter};

/// Characters that end a sentence.
pub const SENTENCE_TERMINATORS: &[char] = &['。', '！', '？', '.', '!', '?'];

/// Splits text after sentence-ending punctuation, packing whole sentences
/// into segments of at most `max_chars` characters.
///
/// A single sentence longer than `max_chars` is hard-split so no segment
/// exceeds the bound.
///
/// # Examples
///
/// ```
/// use parable_core::{SentenceSegmenter, TextSegmenter};
///
/// let segmenter = SentenceSegmenter::new(6);
/// let segments = segmenter.segment("农夫种田。兔子撞树。");
/// assert_eq!(segments.len(), 2);
/// assert_eq!(segments[1].text(), "兔子撞树。");
/// ```
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    max_chars: usize,
}

impl SentenceSegmenter {
    /// Create a segmenter with the given per-segment character bound.
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    fn sentences(text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            current.push(ch);
            if SENTENCE_TERMINATORS.contains(&ch) {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                current.clear();
            }
        }
        let rest = current.trim();
        if !rest.is_empty() {
            sentences.push(rest.to_string());
        }
        sentences
    }
}

impl TextSegmenter for SentenceSegmenter {
    fn segment(&self, text: &str) -> Vec<Segment> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for sentence in Self::sentences(text) {
            let len = sentence.chars().count();
            if current_len > 0 && current_len + len > self.max_chars {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if len > self.max_chars {
                let chars: Vec<char> = sentence.chars().collect();
                for piece in chars.chunks(self.max_chars) {
                    chunks.push(piece.iter().collect());
                }
                continue;
            }
            current.push_str(&sentence);
            current_len += len;
        }
        if current_len > 0 {
            chunks.push(current);
        }

        chunks
            .into_iter()
            .enumerate()
            .map(|(index, text)| Segment::new(index, text))
            .collect()
    }
}
