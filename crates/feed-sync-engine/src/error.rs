//! Error types for the sync engine and the command channel.
//!
//! Sync errors are never fatal: the engine keeps the last good snapshot on
//! screen and retries in the background. Command errors go straight back to
//! the user, who decides whether to retry.

use feed_http_client::ClientError;
use thiserror::Error;

/// Failure while acquiring a snapshot.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fetch or stream failure (connection refused, bad status, broken body).
    #[error("Feed request failed: {0}")]
    Network(#[source] ClientError),

    /// The server sent a payload that is not a snapshot.
    #[error("Malformed feed payload: {0}")]
    Decode(String),

    /// The event stream ended.
    #[error("Event stream ended")]
    StreamEnded,

    /// Any other transport failure: a poll that outlived its deadline, or an
    /// error raised by a custom `SnapshotSource` or `StreamConnector`.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl SyncError {
    /// True for malformed payloads, as opposed to network failures.
    ///
    /// Both take the same recovery path; the distinction is for logs.
    pub fn is_decode(&self) -> bool {
        matches!(self, SyncError::Decode(_))
    }
}

impl From<ClientError> for SyncError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Json(e) => SyncError::Decode(e.to_string()),
            ClientError::StreamClosed => SyncError::StreamEnded,
            other => SyncError::Network(other),
        }
    }
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;

/// Failure of a user-issued command (send, delete, upload).
#[derive(Debug, Error)]
pub enum CommandError {
    /// Rejected locally before anything was transmitted.
    #[error("{0}")]
    Validation(String),

    /// The command needs the admin capability.
    #[error("This action requires admin privileges")]
    Forbidden,

    /// The server answered `success: false` with this reason.
    #[error("{0}")]
    Rejected(String),

    /// Reading a local file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request did not complete.
    #[error("Request failed: {0}")]
    Request(#[source] ClientError),
}

impl From<ClientError> for CommandError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Rejected(reason) => CommandError::Rejected(reason),
            other => CommandError::Request(other),
        }
    }
}

/// Result type alias using CommandError.
pub type CommandResult<T> = Result<T, CommandError>;
