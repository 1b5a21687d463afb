//! Word and sentence boundaries around an arbitrary buffer offset.
//!
//! These are pure helpers over a `&str`; they never fail. Offsets beyond the
//! buffer or inside a multi-byte character are clamped / floored first so
//! callers can feed raw hit-test results straight in.
//!
//! Word characters are letters only: a grapheme cluster counts as a word
//! character when its first scalar is alphabetic (so `e` + combining acute
//! stays one word character). Digits and punctuation split words.

use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

/// Sentence terminators. The terminator itself belongs to the sentence it ends.
pub const SENTENCE_TERMINATORS: [char; 5] = ['.', '!', '?', '\n', '\r'];

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut o = offset.min(text.len());
    while !text.is_char_boundary(o) {
        o -= 1;
    }
    o
}

/// Letter classification for a grapheme cluster.
pub fn is_word_cluster(g: &str) -> bool {
    g.chars().next().is_some_and(char::is_alphabetic)
}

/// Expand `offset` to the surrounding run of letters.
///
/// Returns an empty range positioned at the clamped offset when no letter is
/// adjacent (including offset `0` of an empty buffer or `text.len()`).
pub fn word_range(text: &str, offset: usize) -> Range<usize> {
    let offset = floor_char_boundary(text, offset);
    let mut start = offset;
    for (idx, g) in text[..offset].grapheme_indices(true).rev() {
        if !is_word_cluster(g) {
            break;
        }
        start = idx;
    }
    let mut end = offset;
    for (idx, g) in text[offset..].grapheme_indices(true) {
        if !is_word_cluster(g) {
            break;
        }
        end = offset + idx + g.len();
    }
    start..end
}

/// Extract the sentence containing `offset`.
///
/// Scans left to the nearest terminator (or buffer start) and skips the
/// whitespace following it, then scans right to the next terminator
/// (inclusive) or buffer end. Trailing whitespace is dropped and internal
/// whitespace runs collapse to one space. An offset past the buffer end yields
/// an empty string.
pub fn sentence_at(text: &str, offset: usize) -> String {
    if offset > text.len() {
        return String::new();
    }
    let offset = floor_char_boundary(text, offset);
    let mut start = text[..offset]
        .char_indices()
        .rev()
        .find(|(_, c)| SENTENCE_TERMINATORS.contains(c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    start += text[start..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(text.len() - start);
    let end = text[offset..]
        .char_indices()
        .find(|(_, c)| SENTENCE_TERMINATORS.contains(c))
        .map(|(i, c)| offset + i + c.len_utf8())
        .unwrap_or(text.len());
    if start >= end {
        return String::new();
    }
    collapse_whitespace(text[start..end].trim_end())
}

/// Collapse every whitespace run to a single ASCII space (trims both ends).
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// `true` when `text` is non-empty and consists only of characters that are
/// neither alphanumeric nor whitespace.
pub fn is_punctuation_only(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| !c.is_alphanumeric() && !c.is_whitespace())
}
