//! # Feed Sync Engine
//!
//! Keeps a live message window in sync with the feed server.
//!
//! One of two strategies acquires snapshots, fixed at construction:
//!
//! - **Pull**: fetch the full list on open and then on a fixed interval.
//! - **Push**: hold one event-stream session open, reconnecting after a
//!   delay when it fails, ends, or outlives its maximum lifetime.
//!
//! Either way every snapshot goes through the same pipeline: drop it if the
//! engine has closed or a newer request already landed, compare it with the
//! last one, re-render on change, and play the cue when a newer message
//! arrived.
//!
//! ```text
//!  Transport ──▶ TransportSink ──▶ SyncEngine ──▶ MessageStore
//!      ▲                              │
//!      │ refresh()                    ▼
//!  CommandChannel ◀── user        Renderer
//! ```
//!
//! Commands (send, delete, upload) never touch the store directly; they ask
//! the engine to refresh and let the next snapshot carry the change.

mod commands;
mod engine;
mod error;
mod renderer;
mod scheduler;
mod settings;
mod state;
mod store;
mod transport;

#[cfg(test)]
mod tests;

pub use commands::{mime_for_path, Capability, CommandBackend, CommandChannel, CommandLimits};
pub use engine::SyncEngine;
pub use error::{CommandError, CommandResult, SyncError, SyncResult};
pub use renderer::Renderer;
pub use scheduler::ReconnectScheduler;
pub use settings::SyncSettings;
pub use state::ConnectionState;
pub use store::{Acceptance, MessageStore};
pub use transport::{
    PullTransport, PushSettings, PushTransport, RequestTicket, SnapshotFrames, SnapshotSource,
    StreamConnector, Transport, TransportSink,
};
