//! Merchandising rule application on a single search result.

use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::types::Rule;

/// Apply `rules` in order to one per-query result.
///
/// A promote action stores its payload under `promoted`; later rules
/// overwrite earlier ones. A hide action removes every `hits.hits` element
/// whose `_id` equals a target, keeps the rest in order, and sets
/// `hits.total` to the remaining count.
///
/// # Errors
///
/// Returns [`GatewayError::StructuralMismatch`] if the result is not an
/// object, or a hide is requested and `hits.hits` is not an array of
/// objects.
pub fn apply_rules(result: &mut Value, rules: &[Rule]) -> Result<()> {
    let object = result.as_object_mut().ok_or_else(|| {
        GatewayError::StructuralMismatch("result is not a JSON object".into())
    })?;

    for rule in rules {
        if let Some(promote) = &rule.then.promote {
            object.insert("promoted".into(), promote.clone());
        }

        let Some(hide) = rule.then.hide.as_deref() else {
            continue;
        };
        let hits = object
            .get_mut("hits")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| GatewayError::StructuralMismatch("result has no `hits`".into()))?;
        let docs = hits
            .get_mut("hits")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| {
                GatewayError::StructuralMismatch("`hits.hits` is not an array".into())
            })?;

        if docs.iter().any(|doc| !doc.is_object()) {
            return Err(GatewayError::StructuralMismatch(
                "hit is not a JSON object".into(),
            ));
        }

        let before = docs.len();
        docs.retain(|doc| match doc_id(doc) {
            Some(id) => !hide.iter().any(|h| h.doc_id == id),
            None => true,
        });
        let remaining = docs.len();
        hits.insert("total".into(), Value::from(remaining));

        tracing::debug!(
            term = %rule.match_term,
            hidden = before - remaining,
            remaining,
            "applied hide rule"
        );
    }
    Ok(())
}

fn doc_id(doc: &Value) -> Option<String> {
    match doc.get("_id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
