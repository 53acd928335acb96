//! Error types for the searchgate-core crate.
//!
//! All errors use stable string messages suitable for returning to API
//! clients. Query values and document contents never appear in messages.

/// Errors that can occur while planning, executing or post-processing a
/// fan-out search request.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The client request is invalid. Raised before any upstream call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The backend could not be reached, or kept answering with a 5xx
    /// status, after the retry budget was exhausted.
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable {
        /// Last backend status seen, if any response arrived at all.
        status: Option<u16>,
        /// Description of the final failure.
        message: String,
    },

    /// The backend refused the batch with a 4xx status. The body is kept
    /// verbatim so it can be passed through to the client.
    #[error("backend rejected request with status {status}")]
    BackendRejected {
        /// Backend status code.
        status: u16,
        /// Raw backend response body.
        body: String,
    },

    /// The backend answered 2xx but the body is not a JSON object.
    #[error("backend protocol error: {0}")]
    BackendProtocol(String),

    /// The batched reply does not line up with the query plan.
    #[error("partial response: {0}")]
    PartialResponse(String),

    /// A rule could not be applied because the result lacks the expected shape.
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),

    /// The batch call exceeded its total deadline.
    #[error("backend timed out: {0}")]
    Timeout(String),

    /// Invalid gateway configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for searchgate-core results.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_validation() {
        let err = GatewayError::Validation("duplicate query id `a`".into());
        assert_eq!(err.to_string(), "validation error: duplicate query id `a`");
    }

    #[test]
    fn display_upstream_unavailable() {
        let err = GatewayError::UpstreamUnavailable {
            status: Some(503),
            message: "backend returned 503 after 3 attempts".into(),
        };
        assert_eq!(
            err.to_string(),
            "upstream unavailable: backend returned 503 after 3 attempts"
        );
    }

    #[test]
    fn display_backend_rejected_hides_body() {
        let err = GatewayError::BackendRejected {
            status: 400,
            body: r#"{"error":"parsing_exception"}"#.into(),
        };
        assert_eq!(err.to_string(), "backend rejected request with status 400");
    }

    #[test]
    fn display_partial_response() {
        let err = GatewayError::PartialResponse("expected 2 responses, got 1".into());
        assert_eq!(err.to_string(), "partial response: expected 2 responses, got 1");
    }

    #[test]
    fn display_structural_mismatch() {
        let err = GatewayError::StructuralMismatch("hits.hits is not an array".into());
        assert_eq!(err.to_string(), "structural mismatch: hits.hits is not an array");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GatewayError>();
    }
}
