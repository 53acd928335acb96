//! searchgate: a search gateway in front of an Elasticsearch-compatible backend.
//!
//! Clients send one request holding several named sub-queries. The gateway
//! answers all of them with a single backend `_msearch` call and returns one
//! result per query id:
//! Request → Plan → Backend batch → Demux → Suggestions → Aliases → Rules → Response
//!
//! # Architecture
//!
//! - **searchgate-core**: the pipeline itself, free of any listener
//! - **config**: TOML configuration for the server, backend, aliases and rules
//! - **server**: axum routes, request logging and graceful shutdown
//! - **rules**: rule lookup by index and search term

pub mod config;
pub mod error;
pub mod rules;
pub mod server;

pub use config::GatewayConfig;
pub use error::{AppError, Result};
pub use rules::{RuleSource, StaticRuleSource};
pub use server::{AppState, GatewayServer};
