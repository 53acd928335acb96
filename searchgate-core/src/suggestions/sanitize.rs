//! Strict HTML sanitizer for suggestion values.
//!
//! Every tag is removed and only text content survives. Text inside
//! `script`/`style`-like elements is dropped entirely, and entities are
//! decoded, so the output is plain text. The policy is fixed at construction
//! and the type is `Send + Sync`; build one per process and share it.

use scraper::{Html, Node};

/// Elements whose text content never reaches the output.
const DROPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "iframe"];

/// Tag-stripping sanitizer producing plain text.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    dropped: &'static [&'static str],
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::strict()
    }
}

impl Sanitizer {
    /// The strict policy: no tags allowed at all.
    pub fn strict() -> Self {
        Self {
            dropped: DROPPED_ELEMENTS,
        }
    }

    /// Strip all markup from `input` and return its visible text.
    pub fn sanitize(&self, input: &str) -> String {
        // Nothing to parse.
        if !input.contains('<') && !input.contains('&') {
            return input.to_owned();
        }

        let fragment = Html::parse_fragment(input);
        let mut text = String::with_capacity(input.len());
        for node in fragment.tree.root().descendants() {
            let Node::Text(chunk) = node.value() else {
                continue;
            };
            let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
                Node::Element(element) => self.dropped.iter().any(|d| *d == element.name()),
                _ => false,
            });
            if !hidden {
                text.push_str(chunk);
            }
        }
        text
    }
}
