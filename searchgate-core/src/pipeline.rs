//! End-to-end processing of one fan-out request.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::alias::{plan_substitutions, translate, AliasLookup, Substitution};
use crate::demux::demultiplex;
use crate::error::{GatewayError, Result};
use crate::executor::BatchExecutor;
use crate::plan::compile;
use crate::rules::apply_rules;
use crate::suggestions::sanitize::Sanitizer;
use crate::suggestions::stopwords::Stopwords;
use crate::suggestions::SuggestionEngine;
use crate::types::{QueryType, Rule, SearchRequest};

/// Compiles, executes and post-processes fan-out requests.
///
/// Cheap to clone; all shared state sits behind `Arc`s or the pooled client.
#[derive(Debug, Clone)]
pub struct SearchPipeline {
    executor: BatchExecutor,
    sanitizer: Arc<Sanitizer>,
    stopwords: Arc<Stopwords>,
}

impl SearchPipeline {
    /// Create a pipeline using `stopwords` as the default predictive list.
    pub fn new(executor: BatchExecutor, stopwords: Stopwords) -> Self {
        Self {
            executor,
            sanitizer: Arc::new(Sanitizer::strict()),
            stopwords: Arc::new(stopwords),
        }
    }

    /// The executor used for backend calls.
    pub fn executor(&self) -> &BatchExecutor {
        &self.executor
    }

    /// Run one request and return the serialized client envelope.
    ///
    /// `fetch_rules` receives the first target index of the request and is
    /// polled concurrently with the backend call. If either fails the other
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Any [`GatewayError`] raised by a stage; nothing is returned partially.
    pub async fn run<F, Fut>(
        &self,
        request: SearchRequest,
        aliases: &dyn AliasLookup,
        fetch_rules: F,
    ) -> Result<Vec<u8>>
    where
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = Result<Vec<Rule>>>,
    {
        let plan = compile(request.query)?;
        let indices = plan.indices();

        let (envelope, rules) = tokio::try_join!(
            self.executor.execute(&plan),
            fetch_rules(indices.first().cloned()),
        )?;

        let engine = SuggestionEngine::new(&self.sanitizer, &self.stopwords);
        let envelope = demultiplex(&plan, envelope, &engine)?;

        let Value::Object(entries) = envelope else {
            return Err(GatewayError::StructuralMismatch(
                "envelope is not an object".into(),
            ));
        };

        // Substitutions rewrite entry values only; envelope keys are query ids.
        let subs = plan_substitutions(&indices, aliases);
        let mut out = Map::new();
        for (key, value) in entries {
            let value = if subs.is_empty() {
                value
            } else {
                translate_value(&key, &value, &subs)?
            };
            out.insert(key, value);
        }

        if !rules.is_empty() {
            for query in plan.queries() {
                if query.query_type != QueryType::Search {
                    continue;
                }
                if let Some(result) = out.get_mut(&query.id) {
                    apply_rules(result, &rules)?;
                }
            }
            tracing::debug!(rules = rules.len(), "applied rules");
        }

        serde_json::to_vec(&Value::Object(out))
            .map_err(|e| GatewayError::StructuralMismatch(format!("serialize envelope: {e}")))
    }
}

fn translate_value(key: &str, value: &Value, subs: &[Substitution]) -> Result<Value> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| GatewayError::PartialResponse(format!("serialize `{key}`: {e}")))?;
    serde_json::from_slice(&translate(&bytes, subs)).map_err(|e| {
        GatewayError::StructuralMismatch(format!("translated `{key}` is not JSON: {e}"))
    })
}
