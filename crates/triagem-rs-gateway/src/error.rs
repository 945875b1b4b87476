//! Error types for gateway requests.

use thiserror::Error;

/// Errors returned by gateway requests.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure (connection refused, timeout, ...).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    /// The configured base URL cannot be used.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
}

impl GatewayError {
    /// HTTP status code when the backend rejected the request.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
