/*!
 * Tests for sentence chunking
 */

use chunkwise::translation::chunker::{self, split, split_sentences};

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[test]
fn test_split_withVariedCorpus_shouldReconstructAndRespectLimit() {
    let corpus = [
        "Hello. How are you?".to_string(),
        "One! Two? Three. Four".to_string(),
        "No punctuation at all in this one".to_string(),
        "Line one.\nLine two.\n\nLine three!".to_string(),
        "Ünïcödé sentences. Ñandú corre rápido! ¿Qué tal?".to_string(),
        crate::common::sentences(40),
    ];

    for text in &corpus {
        for max_chars in [10, 30, 80, 1500] {
            let chunks = split(text, max_chars);
            let rebuilt = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
            assert_eq!(squash(&rebuilt), squash(text), "max_chars={}", max_chars);

            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.index, i);
                assert!(!chunk.text.is_empty());
                let single_sentence = split_sentences(&chunk.text).len() == 1;
                assert!(chunk.char_len() <= max_chars || single_sentence);
            }
        }
    }
}

#[test]
fn test_split_withShortText_shouldYieldOneChunk() {
    let chunks = split("Hello. How are you?", chunker::DEFAULT_MAX_CHARS);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Hello. How are you?");
}

#[test]
fn test_split_withBlankText_shouldYieldNothing() {
    assert!(split("", 100).is_empty());
    assert!(split(" \n\t ", 100).is_empty());
}

#[test]
fn test_splitSentences_shouldNotBreakInsideNumbers() {
    assert_eq!(split_sentences("Pi is 3.14 today. Yes."), vec!["Pi is 3.14 today.", "Yes."]);
}
