//! Connection state reported to the renderer.

use std::fmt;

/// Lifecycle of the engine's connection.
///
/// ```text
/// Idle -> Connecting -> Open -> (Error | Reconnecting) -> Connecting -> ...
///                                  any -> Closed
/// ```
///
/// The pull strategy reports `Open` after each successful fetch and `Error`
/// after a failed one. It never reports `Reconnecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Reconnecting,
    Error,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Error => "error",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
