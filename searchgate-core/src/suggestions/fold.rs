//! Diacritic folding and case-insensitive matching.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip diacritics: canonical decomposition, drop combining marks, recompose.
///
/// - "café" → "cafe"
/// - "naïve" → "naive"
pub fn fold_diacritics(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect()
}

/// Fold diacritics and lowercase, the form both sides are compared in.
pub fn fold_for_match(value: &str) -> String {
    fold_diacritics(value).to_lowercase()
}

/// Whether some token of `query` (split on spaces) occurs in `candidate`,
/// both sides folded. A query with no tokens matches everything.
pub fn word_match(query: &str, candidate: &str) -> bool {
    let folded = fold_for_match(candidate);
    let mut tokens = query.split(' ').filter(|t| !t.is_empty()).peekable();
    if tokens.peek().is_none() {
        return true;
    }
    tokens.any(|token| folded.contains(&fold_for_match(token)))
}

/// Find the first case-insensitive occurrence of `needle` in `haystack`.
///
/// Returns the byte range of the match in `haystack`. The range may differ
/// in length from `needle` when case mapping changes the UTF-8 width.
pub fn find_case_insensitive(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    'outer: for (start, _) in haystack.char_indices() {
        let mut rest = haystack[start..].char_indices();
        let mut end = start;
        for wanted in needle.chars() {
            match rest.next() {
                Some((offset, found)) if found.to_lowercase().eq(wanted.to_lowercase()) => {
                    end = start + offset + found.len_utf8();
                }
                _ => continue 'outer,
            }
        }
        return Some((start, end));
    }
    None
}
