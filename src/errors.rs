//! Error types for the card-charge library.
//!
//! `GatewayError` covers everything that can go wrong inside the library.
//! Expected charge failures (validation, declines, transport trouble) never
//! reach the caller as an `Err`; the gateway folds them into a
//! [`ChargeOutcome`](crate::types::ChargeOutcome). Only configuration problems
//! surface directly.

use thiserror::Error;

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Error during HTTP request/response handling
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error parsing URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Missing or malformed credentials, base URL or client settings
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Amount not in `0.00` format or out of range
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The processor did not answer within the configured timeout
    #[error("Timeout exceeded after {0} ms")]
    TimeoutExceeded(u128),

    /// The processor answered with a server-side or throttling status
    #[error("Processor unavailable: HTTP {0}")]
    ProcessorUnavailable(u16),

    /// The processor answered with a body we could not interpret
    #[error("Malformed processor response: {0}")]
    MalformedResponse(String),
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// Maps a transport error from reqwest, keeping timeouts distinguishable.
    pub(crate) fn from_transport(err: reqwest::Error, timeout_ms: u128) -> Self {
        if err.is_timeout() {
            GatewayError::TimeoutExceeded(timeout_ms)
        } else {
            // Drop the URL so query strings never leak into outcomes.
            GatewayError::HttpError(err.without_url())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GatewayError::ConfigError("missing STRIPE_SECRET_KEY".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: missing STRIPE_SECRET_KEY"
        );

        let err = GatewayError::ProcessorUnavailable(503);
        assert_eq!(err.to_string(), "Processor unavailable: HTTP 503");

        let err = GatewayError::TimeoutExceeded(250);
        assert_eq!(err.to_string(), "Timeout exceeded after 250 ms");
    }

    #[test]
    fn test_error_conversion() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: GatewayError = url_err.into();
        assert!(matches!(err, GatewayError::UrlParseError(_)));
    }
}
