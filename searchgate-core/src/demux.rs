//! Split a batched backend reply back into per-query results.
//!
//! The reply's `responses` array is zipped positionally with the plan's ids.
//! Suggestion queries get their `hits.hits` replaced by the suggestion list;
//! everything else is stored as the backend returned it.

use serde_json::{Map, Value};

use crate::error::{GatewayError, Result};
use crate::plan::QueryPlan;
use crate::suggestions::{RawHit, SuggestionEngine};
use crate::types::{Query, QueryType};

/// Build the client envelope from a backend `_msearch` reply.
///
/// The result is `{settings: {took}, error?, <id>: <result>...}` with exactly
/// one key per plan id.
///
/// # Errors
///
/// Returns [`GatewayError::PartialResponse`] when the reply does not line up
/// with the plan: `responses` missing or of the wrong length, an element that
/// is not an object, or a suggestion query without a decodable `hits.hits`.
pub fn demultiplex(
    plan: &QueryPlan,
    envelope: Value,
    engine: &SuggestionEngine<'_>,
) -> Result<Value> {
    let Value::Object(mut envelope) = envelope else {
        return Err(GatewayError::PartialResponse(
            "backend reply is not an object".into(),
        ));
    };

    let responses = match envelope.remove("responses") {
        Some(Value::Array(responses)) => responses,
        Some(_) => {
            return Err(GatewayError::PartialResponse(
                "`responses` is not an array".into(),
            ))
        }
        None => return Err(GatewayError::PartialResponse("missing `responses`".into())),
    };
    if responses.len() != plan.len() {
        return Err(GatewayError::PartialResponse(format!(
            "expected {} responses, got {}",
            plan.len(),
            responses.len()
        )));
    }

    let mut out = Map::new();
    let took = envelope.remove("took").unwrap_or(Value::Null);
    let mut settings = Map::new();
    settings.insert("took".into(), took);
    out.insert("settings".into(), Value::Object(settings));
    if let Some(error) = envelope.remove("error") {
        out.insert("error".into(), error);
    }

    for (query, response) in plan.queries().iter().zip(responses) {
        let Value::Object(response) = response else {
            return Err(GatewayError::PartialResponse(format!(
                "response for `{}` is not an object",
                query.id
            )));
        };
        let result = match query.query_type {
            QueryType::Suggestion => suggestion_result(query, response, engine)?,
            _ => Value::Object(response),
        };
        out.insert(query.id.clone(), result);
    }

    tracing::debug!(queries = plan.len(), "demultiplexed backend reply");
    Ok(Value::Object(out))
}

fn suggestion_result(
    query: &Query,
    mut response: Map<String, Value>,
    engine: &SuggestionEngine<'_>,
) -> Result<Value> {
    // A per-item backend failure travels to the client as is.
    if response.contains_key("error") && !response.contains_key("hits") {
        return Ok(Value::Object(response));
    }

    let hits = response
        .get_mut("hits")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            GatewayError::PartialResponse(format!("response for `{}` has no `hits`", query.id))
        })?;
    let raw = match hits.remove("hits") {
        Some(Value::Array(raw)) => raw,
        _ => {
            return Err(GatewayError::PartialResponse(format!(
                "response for `{}` has no `hits.hits` array",
                query.id
            )))
        }
    };

    let suggestions = match query.suggestion_config()? {
        Some(config) => {
            let raw_hits: Vec<RawHit> = raw
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| {
                    GatewayError::PartialResponse(format!(
                        "undecodable hit for `{}`: {e}",
                        query.id
                    ))
                })?;
            tracing::trace!(id = %query.id, value = %config.value, "building suggestions");
            engine.suggest(&config, &raw_hits)
        }
        None => Vec::new(),
    };

    let list = serde_json::to_value(&suggestions).map_err(|e| {
        GatewayError::PartialResponse(format!("suggestions for `{}`: {e}", query.id))
    })?;
    hits.insert("hits".into(), list);
    Ok(Value::Object(response))
}
