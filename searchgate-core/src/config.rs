//! Backend configuration with sensible defaults.
//!
//! [`BackendConfig`] controls where the batched `_msearch` call goes, how long
//! each attempt and the whole call may take, and how transient failures are
//! retried.

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Configuration for the upstream search backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. `http://localhost:9200`.
    pub url: String,
    /// Per-attempt HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Deadline for the whole batch call, retries included, in seconds.
    pub total_timeout_seconds: u64,
    /// Retries after the first attempt. Only transient failures are retried.
    pub max_retries: u32,
    /// Random backoff range in milliseconds `(min, max)` between attempts.
    pub retry_delay_ms: (u64, u64),
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".into(),
            timeout_seconds: 10,
            total_timeout_seconds: 30,
            max_retries: 2,
            retry_delay_ms: (50, 250),
        }
    }
}

impl BackendConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `url` must parse as an absolute `http`/`https` URL
    /// - `timeout_seconds` must be greater than 0
    /// - `total_timeout_seconds` must be >= `timeout_seconds`
    /// - `retry_delay_ms.0` must be <= `retry_delay_ms.1`
    pub fn validate(&self) -> Result<(), GatewayError> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| GatewayError::Config(format!("backend url is invalid: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GatewayError::Config(
                "backend url must use http or https".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(GatewayError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.total_timeout_seconds < self.timeout_seconds {
            return Err(GatewayError::Config(
                "total_timeout_seconds must be >= timeout_seconds".into(),
            ));
        }
        if self.retry_delay_ms.0 > self.retry_delay_ms.1 {
            return Err(GatewayError::Config(
                "retry_delay_ms min must be <= max".into(),
            ));
        }
        Ok(())
    }
}
