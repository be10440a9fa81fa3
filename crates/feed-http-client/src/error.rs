//! Error types for the feed HTTP client.

use thiserror::Error;

/// Error type for all feed endpoint calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or transport-level HTTP error from reqwest.
    ///
    /// Includes connection failures, timeouts, and broken streams.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status and no usable envelope.
    #[error("Server error: {status} - {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The response body, for debugging.
        message: String,
    },

    /// The server answered `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// A response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The event stream ended without an error.
    #[error("Event stream closed by server")]
    StreamClosed,

    /// Endpoint configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Config(#[from] feed_config_and_utils::CoreError),
}

impl ClientError {
    /// True for malformed payloads, as opposed to network failures.
    pub fn is_decode(&self) -> bool {
        matches!(self, ClientError::Json(_))
    }
}

/// Result type alias using ClientError.
pub type ClientResult<T> = Result<T, ClientError>;
