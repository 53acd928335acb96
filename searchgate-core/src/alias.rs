//! Index ↔ alias name translation over serialized responses.
//!
//! The backend reports real index names (`_index`), while clients address
//! indices by their public aliases. Names are swapped on the serialized
//! envelope as quoted strings (`"products"` → `"catalog"`), so only whole
//! JSON string values and keys are touched.

use std::collections::HashMap;

use crate::error::{GatewayError, Result};

/// Lookup of index aliases, supplied by the embedding application.
pub trait AliasLookup: Send + Sync {
    /// Public alias of a real index name.
    fn alias_of(&self, index: &str) -> Option<&str>;

    /// Real index name behind an alias.
    fn index_of(&self, alias: &str) -> Option<&str>;
}

/// In-memory bidirectional alias table.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    to_alias: HashMap<String, String>,
    to_index: HashMap<String, String>,
}

impl AliasMap {
    /// Build a map from `(index, alias)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if an alias or index appears twice.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::default();
        for (index, alias) in pairs {
            let (index, alias) = (index.into(), alias.into());
            if map.to_index.contains_key(&alias) {
                return Err(GatewayError::Config(format!(
                    "alias `{alias}` is assigned to more than one index"
                )));
            }
            if map.to_alias.contains_key(&index) {
                return Err(GatewayError::Config(format!(
                    "index `{index}` has more than one alias"
                )));
            }
            map.to_index.insert(alias.clone(), index.clone());
            map.to_alias.insert(index, alias);
        }
        Ok(map)
    }

    /// Number of aliases.
    pub fn len(&self) -> usize {
        self.to_alias.len()
    }

    /// Whether no alias is defined.
    pub fn is_empty(&self) -> bool {
        self.to_alias.is_empty()
    }
}

impl AliasLookup for AliasMap {
    fn alias_of(&self, index: &str) -> Option<&str> {
        self.to_alias.get(index).map(String::as_str)
    }

    fn index_of(&self, alias: &str) -> Option<&str> {
        self.to_index.get(alias).map(String::as_str)
    }
}

/// One quoted-name replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    from: Vec<u8>,
    to: Vec<u8>,
}

impl Substitution {
    /// Replace the quoted name `from` with the quoted name `to`.
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: quoted(from),
            to: quoted(to),
        }
    }

    /// The reverse replacement.
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

fn quoted(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() + 2);
    out.push(b'"');
    out.extend_from_slice(name.as_bytes());
    out.push(b'"');
    out
}

/// Substitutions for the indices a request targeted.
///
/// An index with an alias is replaced by it. A name that is itself an alias
/// means the backend answered with the real index, which is replaced by the
/// alias the client used. Unknown names produce nothing.
pub fn plan_substitutions(indices: &[String], aliases: &dyn AliasLookup) -> Vec<Substitution> {
    let mut subs: Vec<Substitution> = Vec::new();
    for name in indices {
        let sub = if let Some(alias) = aliases.alias_of(name) {
            Substitution::new(name, alias)
        } else if let Some(index) = aliases.index_of(name) {
            Substitution::new(index, name)
        } else {
            continue;
        };
        if sub.from != sub.to && !subs.iter().any(|s| s.from == sub.from) {
            subs.push(sub);
        }
    }
    subs
}

/// Apply `subs` to `input` in a single left-to-right pass.
///
/// At each position the longest matching pattern wins, and replaced bytes
/// are never scanned again, so one substitution's output cannot feed another.
pub fn translate(input: &[u8], subs: &[Substitution]) -> Vec<u8> {
    if subs.is_empty() {
        return input.to_vec();
    }

    let mut ordered: Vec<&Substitution> = subs.iter().filter(|s| !s.from.is_empty()).collect();
    ordered.sort_by(|a, b| b.from.len().cmp(&a.from.len()));

    let mut out = Vec::with_capacity(input.len());
    let mut pos = 0;
    while pos < input.len() {
        // Every pattern starts with a quote.
        if input[pos] == b'"' {
            if let Some(sub) = ordered.iter().find(|s| input[pos..].starts_with(&s.from)) {
                out.extend_from_slice(&sub.to);
                pos += sub.from.len();
                continue;
            }
        }
        out.push(input[pos]);
        pos += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_map() -> AliasMap {
        AliasMap::from_pairs([("products", "catalog"), ("users", "people")]).expect("map")
    }

    #[test]
    fn lookup_both_directions() {
        let map = make_map();
        assert_eq!(map.alias_of("products"), Some("catalog"));
        assert_eq!(map.index_of("catalog"), Some("products"));
        assert_eq!(map.alias_of("catalog"), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn duplicate_alias_rejected() {
        let err = AliasMap::from_pairs([("a", "x"), ("b", "x")]).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn index_name_replaced_by_alias() {
        let map = make_map();
        let subs = plan_substitutions(&["products".to_string()], &map);
        let out = translate(br#"{"_index":"products","title":"products"}"#, &subs);
        assert_eq!(out, br#"{"_index":"catalog","title":"catalog"}"#.to_vec());
    }

    #[test]
    fn alias_request_restores_alias() {
        let map = make_map();
        let subs = plan_substitutions(&["catalog".to_string()], &map);
        assert_eq!(subs, vec![Substitution::new("products", "catalog")]);
    }

    #[test]
    fn unknown_names_untouched() {
        let map = make_map();
        assert!(plan_substitutions(&["orders".to_string()], &map).is_empty());
        let input = br#"{"_index":"orders"}"#;
        assert_eq!(translate(input, &[]), input.to_vec());
    }

    #[test]
    fn only_whole_quoted_names_replaced() {
        let subs = vec![Substitution::new("products", "catalog")];
        let out = translate(br#"{"a":"products_v2","b":"my products"}"#, &subs);
        assert_eq!(out, br#"{"a":"products_v2","b":"my products"}"#.to_vec());
    }

    #[test]
    fn single_pass_does_not_chain() {
        let subs = vec![Substitution::new("a", "b"), Substitution::new("b", "c")];
        let out = translate(br#"["a","b"]"#, &subs);
        assert_eq!(out, br#"["b","c"]"#.to_vec());
    }

    #[test]
    fn round_trip_through_inverse() {
        let map = make_map();
        let subs = plan_substitutions(&["products".to_string(), "users".to_string()], &map);
        let inverse: Vec<Substitution> = subs.iter().map(Substitution::inverse).collect();

        let original = br#"{"a":{"_index":"products"},"b":{"_index":"users"}}"#;
        let forward = translate(original, &subs);
        assert_ne!(forward, original.to_vec());
        assert_eq!(translate(&forward, &inverse), original.to_vec());
    }
}
