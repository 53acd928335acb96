//! Batch executor: one `_msearch` round trip per client request.
//!
//! The compiled plan is sent as a single upstream call regardless of how many
//! sub-queries it carries. Transient failures (connection errors, per-attempt
//! timeouts, 5xx) are retried with randomized backoff up to the configured
//! budget; 4xx answers are final because the payload is deterministic. A total
//! deadline bounds the call, retries included.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::config::BackendConfig;
use crate::error::{GatewayError, Result};
use crate::http::{build_client, retry_delay};
use crate::plan::QueryPlan;

/// Outcome of one HTTP attempt.
enum Attempt {
    /// Final answer, success or not.
    Done(Result<Value>),
    /// Worth another try if the budget allows.
    Transient {
        status: Option<u16>,
        message: String,
    },
}

/// Sends compiled query plans to the backend's multi-search endpoint.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    client: reqwest::Client,
    base_url: Url,
    config: BackendConfig,
}

impl BatchExecutor {
    /// Create an executor with a fresh pooled client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the configuration is invalid or
    /// the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.url)
            .map_err(|e| GatewayError::Config(format!("backend url is invalid: {e}")))?;
        let client = build_client(&config)?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// The backend configuration in use.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Build the `_msearch` URL for the given target indices.
    ///
    /// Indices are joined with commas into one path segment; with no
    /// indices the cluster-level endpoint is used and each header line
    /// selects its own index.
    pub fn msearch_url(&self, indices: &[String]) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        if indices.is_empty() {
            format!("{base}/_msearch")
        } else {
            format!("{base}/{}/_msearch", indices.join(","))
        }
    }

    /// Execute the plan and return the parsed backend envelope.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UpstreamUnavailable`] when the backend stays
    ///   unreachable or keeps answering 5xx after all retries
    /// - [`GatewayError::BackendRejected`] on a 4xx answer
    /// - [`GatewayError::BackendProtocol`] when a 2xx body is not a JSON object
    /// - [`GatewayError::Timeout`] when the total deadline passes
    pub async fn execute(&self, plan: &QueryPlan) -> Result<Value> {
        let deadline = Duration::from_secs(self.config.total_timeout_seconds);
        match tokio::time::timeout(deadline, self.execute_with_retry(plan)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(format!(
                "no backend reply within {}s",
                self.config.total_timeout_seconds
            ))),
        }
    }

    async fn execute_with_retry(&self, plan: &QueryPlan) -> Result<Value> {
        let url = self.msearch_url(&plan.indices());
        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = std::time::Instant::now();
            match self.send_once(&url, plan.payload()).await {
                Attempt::Done(result) => {
                    tracing::debug!(
                        attempt,
                        queries = plan.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        ok = result.is_ok(),
                        "backend batch call finished"
                    );
                    return result;
                }
                Attempt::Transient { status, message } => {
                    if attempt >= max_attempts {
                        tracing::error!(attempt, ?status, error = %message, "backend unavailable");
                        return Err(GatewayError::UpstreamUnavailable {
                            status,
                            message: format!("{message} after {attempt} attempts"),
                        });
                    }
                    let delay = retry_delay(self.config.retry_delay_ms);
                    tracing::warn!(
                        attempt,
                        ?status,
                        error = %message,
                        delay_ms = delay.as_millis() as u64,
                        "transient backend failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(&self, url: &str, payload: &str) -> Attempt {
        let response = match self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(payload.to_owned())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if is_transient(&e) => {
                return Attempt::Transient {
                    status: None,
                    message: format!("backend request failed: {e}"),
                }
            }
            Err(e) => {
                return Attempt::Done(Err(GatewayError::UpstreamUnavailable {
                    status: None,
                    message: format!("backend request failed: {e}"),
                }))
            }
        };

        let status = response.status();
        if status.is_server_error() {
            return Attempt::Transient {
                status: Some(status.as_u16()),
                message: format!("backend returned {status}"),
            };
        }

        match response.bytes().await {
            Ok(body) => classify_reply(status, Ok(&body[..])),
            Err(e) => classify_reply(status, Err(format!("backend response read failed: {e}"))),
        }
    }
}

/// Decide the outcome of a non-5xx reply from its status and body.
///
/// A 4xx is final even when its body could not be read.
fn classify_reply(status: StatusCode, body: std::result::Result<&[u8], String>) -> Attempt {
    let body = match body {
        Ok(body) => body,
        Err(message) if status.is_client_error() => {
            tracing::warn!(%status, error = %message, "backend rejection body unreadable");
            return Attempt::Done(Err(GatewayError::BackendRejected {
                status: status.as_u16(),
                body: String::new(),
            }));
        }
        Err(message) => {
            return Attempt::Transient {
                status: Some(status.as_u16()),
                message,
            }
        }
    };

    if status.is_client_error() {
        return Attempt::Done(Err(GatewayError::BackendRejected {
            status: status.as_u16(),
            body: String::from_utf8_lossy(body).into_owned(),
        }));
    }
    if !status.is_success() {
        return Attempt::Done(Err(GatewayError::BackendProtocol(format!(
            "unexpected backend status {status}"
        ))));
    }

    tracing::trace!(bytes = body.len(), "backend response received");

    Attempt::Done(parse_envelope(body))
}

/// Parse a 2xx backend body, which must be a JSON object.
fn parse_envelope(body: &[u8]) -> Result<Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(GatewayError::BackendProtocol(
            "backend response is not a JSON object".into(),
        )),
        Err(e) => Err(GatewayError::BackendProtocol(format!(
            "backend response is not valid JSON: {e}"
        ))),
    }
}

/// Connection-level failures that a retry may cure.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request() || err.is_body()
}
