//! Rule lookup for merchandising rules.
//!
//! The pipeline asks for the rules matching the request's first index and
//! the term from the `X-Search-Query` header. [`StaticRuleSource`] answers
//! from the configuration file; other stores plug in through [`RuleSource`].

use async_trait::async_trait;
use searchgate_core::Rule;

use crate::config::RuleConfig;

/// Source of merchandising rules.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Rules for `term` on `index`, in application order.
    async fn rules_for(&self, index: &str, term: &str) -> searchgate_core::Result<Vec<Rule>>;
}

/// A rule bound to the index it applies to.
#[derive(Debug, Clone)]
struct ScopedRule {
    index: String,
    term: String,
    rule: Rule,
}

/// Rules held in memory, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleSource {
    rules: Vec<ScopedRule>,
}

impl StaticRuleSource {
    /// Build from configured rules, keeping their order.
    pub fn from_config(rules: &[RuleConfig]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| ScopedRule {
                    index: r.index.clone(),
                    term: normalize_term(&r.match_term),
                    rule: r.to_rule(),
                })
                .collect(),
        }
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule is configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

#[async_trait]
impl RuleSource for StaticRuleSource {
    async fn rules_for(&self, index: &str, term: &str) -> searchgate_core::Result<Vec<Rule>> {
        let term = normalize_term(term);
        let matched: Vec<Rule> = self
            .rules
            .iter()
            .filter(|r| r.index == index && r.term == term)
            .map(|r| r.rule.clone())
            .collect();
        tracing::debug!(index, matched = matched.len(), "rule lookup");
        Ok(matched)
    }
}
