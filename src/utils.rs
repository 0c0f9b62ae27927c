use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)([^.!?,;:]+[.!?,;:]+)|([^.!?,;:]+$)").unwrap());

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Splits text into pieces of at most `max_chars` characters, preferring
/// punctuation and then word boundaries. A single word longer than the limit
/// is cut hard.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    for cap in SENTENCE.find_iter(text) {
        let s = cap.as_str().trim();
        if !s.is_empty() {
            sentences.push(s.to_string());
        }
    }
    if sentences.is_empty() {
        if text.trim().is_empty() {
            return Vec::new();
        }
        warn!("No sentence breaks found; returning whole text as one chunk");
        sentences.push(text.trim().to_string());
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for word in sentences.iter().flat_map(|s| split_long(s, max_chars)) {
        let len = current.chars().count();
        if current.is_empty() {
            current = word;
        } else if len + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&word);
        } else {
            chunks.push(std::mem::replace(&mut current, word));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Pieces of one sentence, each within `max_chars`.
fn split_long(sentence: &str, max_chars: usize) -> Vec<String> {
    if sentence.chars().count() <= max_chars {
        return vec![sentence.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in sentence.split_whitespace() {
        let mut word = word;
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            let head = truncate_chars(word, max_chars);
            pieces.push(head.to_string());
            word = &word[head.len()..];
        }
        if word.is_empty() {
            continue;
        }
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            pieces.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
