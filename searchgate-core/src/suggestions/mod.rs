//! Suggestion engine: raw hit documents into ranked autocomplete suggestions.
//!
//! # Pipeline
//!
//! 1. Resolve data fields (configured, or inferred from the first hit)
//! 2. Overlay the first highlight snippet of each field onto a copy of `_source`
//! 3. Extract one candidate label per (hit, field)
//! 4. Gate candidates on a diacritic-folded word match with the query
//! 5. Second pass without the word gate when synonyms are enabled and the
//!    first pass produced fewer suggestions than hits
//! 6. Drop repeated labels (exact match)
//! 7. Append predictive completions, if enabled
//! 8. Keep the first suggestion per document, if distinct is enabled

pub mod fields;
pub mod fold;
pub mod predictive;
pub mod sanitize;
pub mod stopwords;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::SuggestionConfig;

use self::fields::{extract_candidate, infer_fields};
use self::fold::word_match;
use self::sanitize::Sanitizer;
use self::stopwords::Stopwords;

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionType {
    /// Extracted from index documents.
    #[default]
    Index,
    /// Popular searches.
    Popular,
    /// The user's recent searches.
    Recent,
    /// Pinned by a merchandising rule.
    Promoted,
}

impl SuggestionType {
    /// Returns the wire name of this suggestion type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Popular => "popular",
            Self::Recent => "recent",
            Self::Promoted => "promoted",
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One autocomplete suggestion, shaped like a backend hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Plain text, markup stripped.
    pub value: String,
    /// Display label, may carry highlight markup.
    pub label: String,
    pub url: Option<String>,
    #[serde(rename = "_suggestion_type")]
    pub suggestion_type: SuggestionType,
    #[serde(rename = "_category")]
    pub category: Option<String>,
    #[serde(rename = "_count")]
    pub count: Option<u64>,
    /// Source document id.
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(rename = "_index")]
    pub index: Option<String>,
    #[serde(rename = "_score")]
    pub score: Option<f64>,
    /// The unhighlighted source document.
    #[serde(rename = "_source")]
    pub source: Map<String, Value>,
}

/// A backend hit as found under `hits.hits`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(rename = "_id", default, deserialize_with = "id_as_string")]
    pub id: Option<String>,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default, deserialize_with = "null_as_empty")]
    pub source: Map<String, Value>,
    /// Field name to highlighted snippets.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub highlight: Map<String, Value>,
}

impl RawHit {
    /// Copy of `_source` with the first snippet of every highlighted field
    /// written over the field's value.
    pub fn highlighted_source(&self) -> Map<String, Value> {
        let mut source = self.source.clone();
        for (field, snippets) in &self.highlight {
            if let Some(first) = snippets.as_array().and_then(|s| s.first()) {
                source.insert(field.clone(), first.clone());
            }
        }
        source
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "document id must be a string or number, got {other}"
        ))),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Suggestions collected so far, with the labels already taken.
#[derive(Debug, Default)]
struct Accumulator {
    suggestions: Vec<Suggestion>,
    labels: HashSet<String>,
}

/// Turns hit lists into suggestion lists.
///
/// Holds only shared, read-only state, so one engine serves every request.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionEngine<'a> {
    sanitizer: &'a Sanitizer,
    stopwords: &'a Stopwords,
}

impl<'a> SuggestionEngine<'a> {
    /// Create an engine over a process-wide sanitizer and default stopwords.
    pub fn new(sanitizer: &'a Sanitizer, stopwords: &'a Stopwords) -> Self {
        Self {
            sanitizer,
            stopwords,
        }
    }

    /// Build the suggestion list for one query.
    pub fn suggest(&self, config: &SuggestionConfig, hits: &[RawHit]) -> Vec<Suggestion> {
        let fields = if config.data_fields.is_empty() {
            hits.first()
                .map(|hit| infer_fields(&hit.source))
                .unwrap_or_default()
        } else {
            config.data_fields.clone()
        };
        let sources: Vec<Map<String, Value>> =
            hits.iter().map(RawHit::highlighted_source).collect();

        let mut acc = Accumulator::default();
        self.traverse(config, &fields, hits, &sources, false, &mut acc);
        let first_pass = acc.suggestions.len();

        if first_pass < hits.len() && config.enable_synonyms {
            // Hits that only matched through backend-side synonym expansion
            // fail the word gate; take them without it.
            self.traverse(config, &fields, hits, &sources, true, &mut acc);
        }

        let mut suggestions = acc.suggestions;
        tracing::trace!(
            hits = hits.len(),
            first_pass,
            recovered = suggestions.len() - first_pass,
            "index suggestions extracted"
        );

        if config.enable_predictive {
            let predicted =
                predictive::predict(config, &suggestions, self.sanitizer, self.stopwords);
            suggestions.extend(predicted);
        }

        if config.show_distinct {
            suggestions = distinct_by_document(suggestions);
        }
        suggestions
    }

    fn traverse(
        &self,
        config: &SuggestionConfig,
        fields: &[String],
        hits: &[RawHit],
        sources: &[Map<String, Value>],
        skip_word_match: bool,
        acc: &mut Accumulator,
    ) {
        for (hit, source) in hits.iter().zip(sources) {
            for field in fields {
                if let Some(label) = extract_candidate(source, field, &config.value) {
                    self.accept(config, hit, label, skip_word_match, acc);
                }
            }
        }
    }

    fn accept(
        &self,
        config: &SuggestionConfig,
        hit: &RawHit,
        label: String,
        skip_word_match: bool,
        acc: &mut Accumulator,
    ) {
        if label.trim().is_empty() || acc.labels.contains(&label) {
            return;
        }
        let value = self.sanitizer.sanitize(&label);
        if !skip_word_match && !word_match(&config.value, &value) {
            return;
        }

        let top_level_text = |field: &Option<String>| {
            field
                .as_deref()
                .and_then(|f| hit.source.get(f))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        acc.labels.insert(label.clone());
        acc.suggestions.push(Suggestion {
            value,
            label,
            url: top_level_text(&config.url_field),
            suggestion_type: SuggestionType::Index,
            category: top_level_text(&config.category_field),
            count: None,
            id: hit.id.clone(),
            index: hit.index.clone(),
            score: hit.score,
            source: hit.source.clone(),
        });
    }
}

/// Keep the first suggestion per source document id, preserving order.
/// Suggestions without an id are dropped.
pub fn distinct_by_document(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut seen = HashSet::new();
    suggestions
        .into_iter()
        .filter(|s| match &s.id {
            Some(id) => seen.insert(id.clone()),
            None => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(id: &str, source: Value) -> RawHit {
        serde_json::from_value(json!({
            "_index": "products",
            "_id": id,
            "_score": 1.0,
            "_source": source
        }))
        .expect("hit")
    }

    fn suggest(config: &SuggestionConfig, hits: &[RawHit]) -> Vec<Suggestion> {
        let sanitizer = Sanitizer::strict();
        let stopwords = Stopwords::english();
        SuggestionEngine::new(&sanitizer, &stopwords).suggest(config, hits)
    }

    fn config(value: &str) -> SuggestionConfig {
        SuggestionConfig {
            value: value.into(),
            ..Default::default()
        }
    }

    #[test]
    fn prefix_query_yields_full_title() {
        let out = suggest(&config("iph"), &[hit("1", json!({"title": "iphone 12"}))]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, "iphone 12");
        assert_eq!(out[0].label, "iphone 12");
        assert_eq!(out[0].suggestion_type, SuggestionType::Index);
        assert_eq!(out[0].id.as_deref(), Some("1"));
        assert_eq!(out[0].index.as_deref(), Some("products"));
    }

    #[test]
    fn highlight_becomes_label() {
        let mut h = hit("1", json!({"title": "iphone 12"}));
        h.highlight = json!({"title": ["<mark>iph</mark>one 12", "ignored"]})
            .as_object()
            .cloned()
            .expect("object");
        let out = suggest(&config("iph"), &[h]);
        assert_eq!(out[0].label, "<mark>iph</mark>one 12");
        assert_eq!(out[0].value, "iphone 12");
        // The source stays unhighlighted.
        assert_eq!(out[0].source["title"], "iphone 12");
    }

    #[test]
    fn configured_fields_in_order() {
        let mut cfg = config("apple");
        cfg.data_fields = vec!["brand".into(), "title".into()];
        let out = suggest(
            &cfg,
            &[hit("1", json!({"title": "apple iphone", "brand": "Apple"}))],
        );
        let labels: Vec<&str> = out.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Apple", "apple iphone"]);
    }

    #[test]
    fn labels_are_unique() {
        let out = suggest(
            &config("iphone"),
            &[
                hit("1", json!({"title": "iphone"})),
                hit("2", json!({"title": "iphone"})),
            ],
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn case_variants_both_survive() {
        let out = suggest(
            &config("iphone"),
            &[
                hit("1", json!({"title": "iPhone"})),
                hit("2", json!({"title": "iphone"})),
            ],
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn synonym_pass_recovers_unmatched_hits_after_matched_ones() {
        let hits = [
            hit("1", json!({"title": "ios device"})),
            hit("2", json!({"title": "iphone 12"})),
        ];
        let out = suggest(&config("iphone"), &hits);
        let labels: Vec<&str> = out.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["iphone 12", "ios device"]);
    }

    #[test]
    fn synonym_pass_disabled() {
        let mut cfg = config("iphone");
        cfg.enable_synonyms = false;
        let hits = [
            hit("1", json!({"title": "ios device"})),
            hit("2", json!({"title": "iphone 12"})),
        ];
        let out = suggest(&cfg, &hits);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "iphone 12");
    }

    #[test]
    fn diacritics_folded_in_word_gate() {
        let mut cfg = config("café");
        cfg.enable_synonyms = false;
        let out = suggest(&cfg, &[hit("1", json!({"name": "Cafe Central"}))]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn distinct_keeps_first_per_document() {
        let mut cfg = config("iphone");
        cfg.show_distinct = true;
        cfg.data_fields = vec!["title".into(), "subtitle".into()];
        let hits = [
            hit("42", json!({"title": "iphone 12", "subtitle": "iphone case"})),
            hit("7", json!({"title": "iphone 13"})),
        ];
        let out = suggest(&cfg, &hits);
        let labels: Vec<&str> = out.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["iphone 12", "iphone 13"]);
    }

    #[test]
    fn distinct_applies_after_predictive() {
        let mut cfg = config("iphone");
        cfg.show_distinct = true;
        cfg.enable_predictive = true;
        let out = suggest(&cfg, &[hit("42", json!({"title": "iphone 12 pro"}))]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "iphone 12 pro");
    }

    #[test]
    fn predictive_results_come_last() {
        let mut cfg = config("iphone");
        cfg.enable_predictive = true;
        cfg.max_predicted_words = 1;
        let out = suggest(&cfg, &[hit("1", json!({"title": "iphone 12 pro"}))]);
        let values: Vec<&str> = out.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["iphone 12 pro", "iphone 12"]);
    }

    #[test]
    fn url_and_category_from_source() {
        let mut cfg = config("iph");
        cfg.url_field = Some("link".into());
        cfg.category_field = Some("cat".into());
        let out = suggest(
            &cfg,
            &[hit(
                "1",
                json!({"title": "iphone", "link": "https://x.test/1", "cat": "phones"}),
            )],
        );
        let first = out.iter().find(|s| s.label == "iphone").expect("title suggestion");
        assert_eq!(first.url.as_deref(), Some("https://x.test/1"));
        assert_eq!(first.category.as_deref(), Some("phones"));
    }

    #[test]
    fn inferred_fields_come_from_first_hit() {
        let hits = [
            hit("1", json!({"title": "iphone 12"})),
            hit("2", json!({"title": "iphone 13", "brand": "iphone maker"})),
        ];
        let out = suggest(&config("iphone"), &hits);
        assert!(out.iter().all(|s| s.label != "iphone maker"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn empty_hits_yield_nothing() {
        assert!(suggest(&config("iphone"), &[]).is_empty());
    }

    #[test]
    fn raw_hit_accepts_numeric_id_and_null_source() {
        let h: RawHit =
            serde_json::from_value(json!({"_id": 42, "_source": null, "_score": null}))
                .expect("hit");
        assert_eq!(h.id.as_deref(), Some("42"));
        assert!(h.source.is_empty());
        assert_eq!(h.score, None);
    }

    #[test]
    fn suggestion_serializes_with_hit_keys() {
        let out = suggest(&config("iph"), &[hit("1", json!({"title": "iphone 12"}))]);
        let json = serde_json::to_value(&out[0]).expect("serialize");
        assert_eq!(json["_suggestion_type"], "index");
        assert_eq!(json["_id"], "1");
        assert_eq!(json["value"], "iphone 12");
        assert!(json["_source"].is_object());
    }

    #[test]
    fn distinct_drops_suggestions_without_id() {
        let mut s = suggest(&config("iph"), &[hit("1", json!({"title": "iphone 12"}))]);
        s[0].id = None;
        assert!(distinct_by_document(s).is_empty());
    }
}
