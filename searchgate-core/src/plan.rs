//! Query plan compilation: N named sub-queries into one `_msearch` payload.
//!
//! The backend's multi-search wire format carries no identifiers. Each query
//! becomes one `{header}\n{body}\n` pair and the reply array comes back in the
//! same order, so the position recorded here is the only correlation key.

use std::collections::HashSet;

use serde_json::{json, Value};

use crate::error::{GatewayError, Result};
use crate::types::{Query, QueryType};

/// Envelope keys that query ids may not shadow.
const RESERVED_IDS: &[&str] = &["settings", "error"];

/// An ordered set of queries plus the compiled batch payload.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    queries: Vec<Query>,
    payload: String,
}

impl QueryPlan {
    /// The queries, in payload order.
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// Query ids, in payload order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(|q| q.id.as_str())
    }

    /// Number of sub-queries, and therefore of expected backend responses.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Whether the plan holds no queries.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// The NDJSON payload for the backend.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Distinct target indices in first-seen order.
    pub fn indices(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.queries
            .iter()
            .filter_map(|q| q.index.as_deref())
            .filter(|index| seen.insert(*index))
            .map(str::to_owned)
            .collect()
    }
}

/// Compile queries into a [`QueryPlan`].
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] if the list is empty, an id is blank,
/// reserved or repeated, a body is missing or not an object, or a suggestion query's
/// options are malformed.
pub fn compile(queries: Vec<Query>) -> Result<QueryPlan> {
    if queries.is_empty() {
        return Err(GatewayError::Validation(
            "request must contain at least one query".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(queries.len());
    let mut payload = String::new();

    for query in &queries {
        if query.id.trim().is_empty() {
            return Err(GatewayError::Validation("query id must not be blank".into()));
        }
        if RESERVED_IDS.contains(&query.id.as_str()) {
            return Err(GatewayError::Validation(format!(
                "query id `{}` is reserved",
                query.id
            )));
        }
        if !seen.insert(query.id.as_str()) {
            return Err(GatewayError::Validation(format!(
                "duplicate query id `{}`",
                query.id
            )));
        }
        if query.query_type == QueryType::Suggestion {
            query.suggestion_config()?;
        }

        let body = match &query.body {
            Some(body @ Value::Object(_)) => body,
            Some(_) => {
                return Err(GatewayError::Validation(format!(
                    "query `{}` body must be a JSON object",
                    query.id
                )))
            }
            None => {
                return Err(GatewayError::Validation(format!(
                    "query `{}` has no body",
                    query.id
                )))
            }
        };

        let header = match &query.index {
            Some(index) => json!({ "index": index }),
            None => json!({}),
        };
        payload.push_str(&header.to_string());
        payload.push('\n');
        payload.push_str(&body.to_string());
        payload.push('\n');
    }

    tracing::debug!(queries = queries.len(), bytes = payload.len(), "compiled query plan");

    Ok(QueryPlan { queries, payload })
}
