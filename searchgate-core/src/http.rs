//! Shared HTTP client for backend requests.
//!
//! One [`reqwest::Client`] is built per process and reused by every request,
//! so connections to the backend are pooled.

use std::time::Duration;

use rand::Rng;

use crate::config::BackendConfig;
use crate::error::GatewayError;

/// User-Agent sent to the backend.
const USER_AGENT: &str = concat!("searchgate/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] configured for the search backend.
///
/// The client has:
/// - Per-attempt timeout from config
/// - A fixed `searchgate/<version>` User-Agent
/// - Brotli and gzip decompression
/// - Redirects disabled (a batch payload must not be replayed elsewhere)
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if the client cannot be constructed.
pub fn build_client(config: &BackendConfig) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))
}

/// Pick a random backoff delay within `(min, max)` milliseconds.
pub fn retry_delay(range: (u64, u64)) -> Duration {
    let (min, max) = range;
    if min >= max {
        return Duration::from_millis(min);
    }
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(min..=max))
}
