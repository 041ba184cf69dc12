//! Gateway error types.

use thiserror::Error;

/// Errors that can occur when calling an upstream source.
///
/// Exhausted retries surface as the last error seen; callers can always
/// distinguish "no data because empty" from "no data because fetch failed".
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The requested resource does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request itself is malformed; retrying cannot help.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Timeout, connection failure, or 5xx-class response.
    #[error("transient upstream error: {0}")]
    Transient(String),
}

impl GatewayError {
    /// Whether the retry loop may try again.
    pub fn is_retriable(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            return GatewayError::Transient(e.to_string());
        }
        if e.is_decode() {
            return GatewayError::InvalidInput(format!("response decode: {}", e));
        }
        match e.status() {
            Some(reqwest::StatusCode::NOT_FOUND) => GatewayError::NotFound(e.to_string()),
            Some(status) if status.is_client_error() => GatewayError::InvalidInput(e.to_string()),
            _ => GatewayError::Transient(e.to_string()),
        }
    }
}
