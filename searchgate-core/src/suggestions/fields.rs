//! Field inference and dotted-path candidate extraction over `_source` trees.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Every leaf path of a source document.
///
/// Nested objects become dotted paths; array elements reuse the parent path;
/// nulls are skipped. The result is sorted and free of duplicates.
///
/// ```text
/// { a: 1, b: { b_1: 2, b_2: 3 } }          → [a, b.b_1, b.b_2]
/// { a: 1, b: [{ c: 1 }, { d: 2 }, { c: 3 }] } → [a, b.c, b.d]
/// ```
pub fn infer_fields(source: &Map<String, Value>) -> Vec<String> {
    let mut fields = BTreeSet::new();
    collect_object(source, "", &mut fields);
    fields.into_iter().collect()
}

fn collect_object(map: &Map<String, Value>, prefix: &str, out: &mut BTreeSet<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        collect_value(value, &path, out);
    }
}

fn collect_value(value: &Value, path: &str, out: &mut BTreeSet<String>) {
    match value {
        Value::Null => {}
        Value::Object(map) => collect_object(map, path, out),
        Value::Array(items) => {
            for item in items {
                collect_value(item, path, out);
            }
        }
        _ => {
            out.insert(path.to_owned());
        }
    }
}

/// Extract the candidate label for `field` from a (highlighted) source.
///
/// A top-level key that itself contains dots wins over path traversal, so
/// highlight snippets overlaid under `user.name` are picked up. Arrays of
/// strings narrow to the first entry containing `query` case-insensitively,
/// else their first string. Objects never terminate into a label.
pub fn extract_candidate(source: &Map<String, Value>, field: &str, query: &str) -> Option<String> {
    if field.contains('.') {
        if let Some(text) = source.get(field).and_then(|v| terminal_text(v, query)) {
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    let (head, rest) = match field.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (field, None),
    };
    let value = source.get(head)?;
    match rest {
        None => terminal_text(value, query),
        Some(rest) => descend(value, rest, query),
    }
}

fn descend(value: &Value, rest: &str, query: &str) -> Option<String> {
    match value {
        Value::Object(map) => extract_candidate(map, rest, query),
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::Object(map) => extract_candidate(map, rest, query),
            _ => None,
        }),
        _ => None,
    }
}

fn terminal_text(value: &Value, query: &str) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => narrow_strings(items, query),
        _ => None,
    }
}

fn narrow_strings(items: &[Value], query: &str) -> Option<String> {
    let strings: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
    let needle = query.to_lowercase();
    strings
        .iter()
        .find(|s| s.to_lowercase().contains(&needle))
        .or_else(|| strings.first())
        .map(|s| (*s).to_owned())
}
