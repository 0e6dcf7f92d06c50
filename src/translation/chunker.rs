/*!
 * Sentence-aware text chunking.
 *
 * Input is split after `.`, `!` or `?` when followed by whitespace, and the
 * resulting sentences are packed greedily into chunks of at most `max_chars`
 * characters. A single sentence longer than the limit becomes its own chunk
 * and is never truncated.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Default chunk size limit in characters
pub const DEFAULT_MAX_CHARS: usize = 1500;

static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.!?]\s+").unwrap_or_else(|e| panic!("invalid sentence boundary pattern: {}", e))
});

/// A contiguous, trimmed piece of the input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the input
    pub index: usize,
    /// Chunk text
    pub text: String,
}

impl Chunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Split text into trimmed sentences, keeping the closing punctuation
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_BOUNDARY.find_iter(text) {
        // The punctuation mark is a single ASCII byte
        let end = m.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// Split `text` into ordered chunks of at most `max_chars` characters.
///
/// Sentences inside a chunk are joined with a single space. Empty or
/// whitespace-only input yields no chunks.
pub fn split(text: &str, max_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();

        if current_chars > 0 && current_chars + 1 + sentence_chars > max_chars {
            chunks.push(Chunk {
                index: chunks.len(),
                text: std::mem::take(&mut current),
            });
            current_chars = 0;
        }

        if current_chars > 0 {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(sentence);
        current_chars += sentence_chars;
    }

    if current_chars > 0 {
        chunks.push(Chunk {
            index: chunks.len(),
            text: current,
        });
    }

    chunks
}
