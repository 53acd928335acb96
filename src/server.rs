//! HTTP front end for the search pipeline.
//!
//! ## Endpoints
//!
//! - `POST /search`: fan-out request, answered with the per-query envelope
//! - `POST /validate`: echoes an NDJSON body back as `application/x-ndjson`
//! - `GET /health`: liveness check

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use searchgate_core::{AliasLookup, BatchExecutor, GatewayError, SearchPipeline, SearchRequest};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info};
use uuid::Uuid;

use crate::config::{GatewayConfig, ServerConfig};
use crate::error::{AppError, Result};
use crate::rules::{RuleSource, StaticRuleSource};

/// Header carrying the user's search term for rule matching.
pub const SEARCH_QUERY_HEADER: &str = "x-search-query";

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: SearchPipeline,
    aliases: Arc<dyn AliasLookup>,
    rules: Arc<dyn RuleSource>,
    /// Cancelled on shutdown; in-flight searches abort.
    cancel: CancellationToken,
}

impl AppState {
    /// Assemble state from its parts.
    pub fn new(
        pipeline: SearchPipeline,
        aliases: Arc<dyn AliasLookup>,
        rules: Arc<dyn RuleSource>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            aliases,
            rules,
            cancel,
        }
    }

    /// Build state from a configuration file's contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &GatewayConfig, cancel: CancellationToken) -> Result<Self> {
        config.validate()?;
        let executor = BatchExecutor::new(config.backend.clone())?;
        let aliases = config.alias_map()?;
        let rules = StaticRuleSource::from_config(&config.rules);
        info!(
            backend = %config.backend.url,
            aliases = aliases.len(),
            rules = rules.len(),
            "gateway state ready"
        );
        Ok(Self::new(
            SearchPipeline::new(executor, config.stopwords()),
            Arc::new(aliases),
            Arc::new(rules),
            cancel,
        ))
    }

    /// Token that stops the server and aborts in-flight searches.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/search", post(handle_search))
        .route("/validate", post(handle_validate))
        .route("/health", get(handle_health))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Serve on `listener` until the state's cancel token fires.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let cancel = state.cancel.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// GatewayServer
// ---------------------------------------------------------------------------

/// A gateway serving in a background task.
pub struct GatewayServer {
    addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl GatewayServer {
    /// Start the gateway.
    ///
    /// Binds to `{config.host}:{config.port}` (use port `0` for auto-assign)
    /// and begins serving in a background tokio task.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(state: AppState, config: &ServerConfig) -> Result<Self> {
        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| AppError::Config(format!("bind {bind_addr} failed: {e}")))?;
        let addr = listener.local_addr()?;
        let cancel = state.cancel.clone();

        info!("searchgate listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = serve(listener, state).await {
                tracing::error!("gateway server error: {e}");
            }
        });

        Ok(Self {
            addr,
            cancel,
            handle,
        })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Cancel in-flight requests and stop accepting new ones.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for GatewayServer {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `POST /search`: run the fan-out pipeline.
async fn handle_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let request: SearchRequest = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::Validation(format!("invalid request body: {e}")))?;
    let term = headers
        .get(SEARCH_QUERY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("search", %request_id, queries = request.query.len());

    let rules = Arc::clone(&state.rules);
    let fetch_rules = move |index: Option<String>| async move {
        match (index, term) {
            (Some(index), Some(term)) => rules.rules_for(&index, &term).await,
            _ => Ok(Vec::new()),
        }
    };

    let run = state
        .pipeline
        .run(request, state.aliases.as_ref(), fetch_rules)
        .instrument(span);

    let envelope = tokio::select! {
        _ = state.cancel.cancelled() => return Err(AppError::Canceled),
        result = run => result?,
    };

    Ok(([(header::CONTENT_TYPE, "application/json")], envelope).into_response())
}

/// `POST /validate`: echo the NDJSON body.
async fn handle_validate(body: Bytes) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/x-ndjson"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        body,
    )
        .into_response()
}

/// `GET /health`: liveness check.
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}
