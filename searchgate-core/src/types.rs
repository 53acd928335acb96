//! Core request types: named sub-queries, their suggestion options, and rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{GatewayError, Result};

/// Default number of words predictive completion may add.
pub const DEFAULT_MAX_PREDICTED_WORDS: usize = 2;

/// The fan-out request accepted by `POST /search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Named sub-queries, answered in one batched backend call.
    pub query: Vec<Query>,
}

/// Kind of a sub-query. Only [`QueryType::Suggestion`] changes how the
/// backend reply is post-processed; every other kind is passed through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Full-text result list.
    #[default]
    Search,
    /// Autocomplete suggestions built from the hits.
    Suggestion,
    /// Term aggregation (facets).
    Term,
    /// Numeric or date range.
    Range,
    /// Geo distance or bounding box.
    Geo,
}

impl QueryType {
    /// Returns the wire name of this query type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Suggestion => "suggestion",
            Self::Term => "term",
            Self::Range => "range",
            Self::Geo => "geo",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A data field reference: a bare field name or a weighted field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    /// Plain field name, e.g. `"title"`.
    Name(String),
    /// Field with a relevance weight, e.g. `{"field": "title", "weight": 3}`.
    Weighted {
        /// Field name.
        field: String,
        /// Boost applied by the query body builder. Ignored here.
        #[serde(default)]
        weight: Option<f64>,
    },
}

impl FieldSpec {
    /// Returns the field name regardless of weighting.
    pub fn field(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Weighted { field, .. } => field,
        }
    }
}

/// `dataField` accepts either a single field or a list of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataField {
    /// A single field name.
    Single(String),
    /// A list of plain or weighted fields.
    Many(Vec<FieldSpec>),
}

impl DataField {
    /// Flatten into plain field names, in declaration order.
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Single(name) => vec![name.clone()],
            Self::Many(specs) => specs.iter().map(|s| s.field().to_owned()).collect(),
        }
    }
}

/// One named sub-query of a fan-out request.
///
/// `body` is the backend request body, already built by the caller. The
/// remaining optional fields only matter for suggestion queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Identifier, unique within one request. Keys the query's result.
    pub id: String,
    /// Query kind.
    #[serde(rename = "type", default)]
    pub query_type: QueryType,
    /// Target index or alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// The user's input. Must be a string for suggestion queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Fields to extract suggestions from. Inferred from the hits when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_field: Option<DataField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_distinct_suggestions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_predictive_suggestions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_predicted_words: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_synonyms: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_stopwords: Option<bool>,
    /// Replaces the built-in stopword list for this query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopwords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_field: Option<String>,
    /// Pre-built backend request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Query {
    /// Build the suggestion engine configuration for this query.
    ///
    /// Returns `Ok(None)` when the query has no value: index suggestions
    /// are not computed for an empty query.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if the value is not a string,
    /// or a data field or stopword is blank.
    pub fn suggestion_config(&self) -> Result<Option<SuggestionConfig>> {
        let value = match &self.value {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(GatewayError::Validation(format!(
                    "suggestion query `{}` must have a string value",
                    self.id
                )))
            }
        };

        let data_fields = self
            .data_field
            .as_ref()
            .map(DataField::names)
            .unwrap_or_default();
        if data_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(GatewayError::Validation(format!(
                "suggestion query `{}` has a blank data field",
                self.id
            )));
        }
        if let Some(stopwords) = &self.stopwords {
            if stopwords.iter().any(|w| w.trim().is_empty()) {
                return Err(GatewayError::Validation(format!(
                    "suggestion query `{}` has a blank stopword",
                    self.id
                )));
            }
        }

        Ok(Some(SuggestionConfig {
            data_fields,
            value,
            show_distinct: self.show_distinct_suggestions.unwrap_or(false),
            enable_predictive: self.enable_predictive_suggestions.unwrap_or(false),
            max_predicted_words: self
                .max_predicted_words
                .unwrap_or(DEFAULT_MAX_PREDICTED_WORDS),
            enable_synonyms: self.enable_synonyms.unwrap_or(true),
            apply_stopwords: self.apply_stopwords.unwrap_or(false),
            stopwords: self.stopwords.clone(),
            url_field: self.url_field.clone(),
            category_field: self.category_field.clone(),
        }))
    }
}

/// Resolved options for one run of the suggestion engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionConfig {
    /// Fields to read. Empty means "infer from the first hit".
    pub data_fields: Vec<String>,
    /// The user's query text.
    pub value: String,
    /// Keep only the first suggestion per source document.
    pub show_distinct: bool,
    /// Append predictive completions.
    pub enable_predictive: bool,
    /// Upper bound on words added by predictive completion.
    pub max_predicted_words: usize,
    /// Run the second, word-match-free pass when the first falls short.
    pub enable_synonyms: bool,
    /// Reject completions bounded by a stopword.
    pub apply_stopwords: bool,
    /// Per-query stopword override.
    pub stopwords: Option<Vec<String>>,
    /// Top-level source field holding a URL for the suggestion.
    pub url_field: Option<String>,
    /// Top-level source field holding a category for the suggestion.
    pub category_field: Option<String>,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            data_fields: Vec::new(),
            value: String::new(),
            show_distinct: false,
            enable_predictive: false,
            max_predicted_words: DEFAULT_MAX_PREDICTED_WORDS,
            enable_synonyms: true,
            apply_stopwords: false,
            stopwords: None,
            url_field: None,
            category_field: None,
        }
    }
}

/// A merchandising rule matched for (index, query term).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// The query term this rule was matched on.
    #[serde(default)]
    pub match_term: String,
    /// Actions to apply.
    pub then: RuleAction,
}

/// Actions carried by a [`Rule`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    /// Payload stored under the result's `promoted` key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promote: Option<Value>,
    /// Documents to remove from `hits.hits`, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<Vec<HiddenDoc>>,
}

/// A document targeted by a hide action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenDoc {
    /// Backend document id.
    #[serde(rename = "docId")]
    pub doc_id: String,
}
