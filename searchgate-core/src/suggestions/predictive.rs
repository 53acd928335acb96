//! Predictive completion: extend a matched suggestion by a few words.
//!
//! For each suggestion whose plain text contains the query, the words right
//! after the match are offered as a completion, longest run first. When no
//! trailing run qualifies, the words right before the match are tried,
//! shortest run first. The completed part is wrapped in a highlight marker.

use std::collections::HashSet;

use super::fold::find_case_insensitive;
use super::sanitize::Sanitizer;
use super::stopwords::Stopwords;
use super::Suggestion;
use crate::types::SuggestionConfig;

const MARK_OPEN: &str = r#"<mark class="highlight">"#;
const MARK_CLOSE: &str = "</mark>";

/// A completed phrase, before lowercasing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Phrase {
    label: String,
    value: String,
}

/// Compute predictive suggestions for `suggestions`.
///
/// Returns only the new suggestions, in input order. Labels are unique among
/// themselves and never repeat a label already present in `suggestions`.
/// `max_predicted_words == 0` disables completion.
pub fn predict(
    config: &SuggestionConfig,
    suggestions: &[Suggestion],
    sanitizer: &Sanitizer,
    default_stopwords: &Stopwords,
) -> Vec<Suggestion> {
    let query = config.value.trim();
    if query.is_empty() || config.max_predicted_words == 0 {
        return Vec::new();
    }

    let custom;
    let stopwords = match (&config.stopwords, config.apply_stopwords) {
        (_, false) => None,
        (Some(words), true) => {
            custom = Stopwords::from_words(words);
            Some(&custom)
        }
        (None, true) => Some(default_stopwords),
    };

    let existing: HashSet<&str> = suggestions.iter().map(|s| s.label.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut predicted = Vec::new();

    for suggestion in suggestions {
        let content = sanitizer.sanitize(&suggestion.label);
        let Some((start, end)) = find_case_insensitive(&content, query) else {
            continue;
        };

        let phrase = suffix_phrase(query, &content[end..], config.max_predicted_words, stopwords)
            .or_else(|| {
                prefix_phrase(query, &content[..start], config.max_predicted_words, stopwords)
            });
        let Some(phrase) = phrase else {
            continue;
        };

        let label = phrase.label.to_lowercase();
        if existing.contains(label.as_str()) || !seen.insert(label.clone()) {
            continue;
        }

        let mut completion = suggestion.clone();
        completion.label = label;
        completion.value = phrase.value.to_lowercase();
        predicted.push(completion);
    }

    tracing::trace!(count = predicted.len(), "predictive suggestions computed");
    predicted
}

/// Longest run of up to `max_words` words after the match.
fn suffix_phrase(
    query: &str,
    tail: &str,
    max_words: usize,
    stopwords: Option<&Stopwords>,
) -> Option<Phrase> {
    // `tail` usually starts with the separating space, which yields a leading
    // empty word, hence the `+ 1`.
    let words: Vec<&str> = tail.split(' ').collect();
    let limit = max_words.saturating_add(1).min(words.len());

    for take in (1..=limit).rev() {
        let run = &words[..take];
        let completion = run.join(" ");
        if completion.trim().is_empty() {
            continue;
        }
        if stopwords.is_some_and(|s| s.contains(run[take - 1])) {
            continue;
        }
        return Some(Phrase {
            label: format!("{query}{MARK_OPEN}{completion}{MARK_CLOSE}"),
            value: format!("{query}{completion}"),
        });
    }
    None
}

/// Shortest run of up to `max_words` words before the match.
fn prefix_phrase(
    query: &str,
    head: &str,
    max_words: usize,
    stopwords: Option<&Stopwords>,
) -> Option<Phrase> {
    let words: Vec<&str> = head.split(' ').collect();
    let limit = max_words.saturating_add(1).min(words.len());

    for take in 1..=limit {
        let run = &words[words.len() - take..];
        let completion = run.join(" ");
        if completion.trim().is_empty() {
            continue;
        }
        if stopwords.is_some_and(|s| s.contains(run[0])) {
            continue;
        }
        return Some(Phrase {
            label: format!("{MARK_OPEN}{completion}{MARK_CLOSE}{query}"),
            value: format!("{completion}{query}"),
        });
    }
    None
}
