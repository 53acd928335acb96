//! # searchgate-core
//!
//! Response-processing core of the searchgate search gateway.
//!
//! A client request carries several named sub-queries. This crate combines
//! them into one backend `_msearch` call, splits the batched reply back into
//! per-query results, turns raw hits into autocomplete suggestions where
//! asked, rewrites index names to their public aliases and applies
//! merchandising rules to the final hit set.
//!
//! ## Design
//!
//! - Order is the only correlation key with the backend: the reply array is
//!   zipped with the plan positionally and checked for length
//! - One upstream call per request; transient failures are retried, 4xx never
//! - Suggestion generation is pure and shares one immutable sanitizer
//! - Alias and rule storage are collaborators: [`alias::AliasLookup`] here,
//!   rule fetching is a future handed to [`SearchPipeline::run`]
//!
//! ## Security
//!
//! - No network listeners; this is a library
//! - Query values are logged only at trace level
//! - Suggestion values are stripped of all markup before they are returned

pub mod alias;
pub mod config;
pub mod demux;
pub mod error;
pub mod executor;
pub mod http;
pub mod pipeline;
pub mod plan;
pub mod rules;
pub mod suggestions;
pub mod types;

pub use alias::{AliasLookup, AliasMap};
pub use config::BackendConfig;
pub use error::{GatewayError, Result};
pub use executor::BatchExecutor;
pub use pipeline::SearchPipeline;
pub use plan::{compile, QueryPlan};
pub use suggestions::{Suggestion, SuggestionEngine, SuggestionType};
pub use types::{Query, QueryType, Rule, SearchRequest};
