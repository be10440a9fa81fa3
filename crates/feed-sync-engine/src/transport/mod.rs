//! Snapshot acquisition strategies.
//!
//! A [`Transport`] acquires snapshots and hands them to a [`TransportSink`].
//! The sink is bound to one engine generation; once the engine closes or
//! restarts, every call on an old sink is silently dropped, so a late fetch
//! or a buffered stream frame can never reach the renderer.

mod http;
mod pull;
mod push;

pub use pull::PullTransport;
pub use push::{PushSettings, PushTransport};

use crate::error::{SyncError, SyncResult};
use crate::state::ConnectionState;
use async_trait::async_trait;
use feed_config_and_utils::TransportKind;
use feed_protocol_types::Snapshot;
use futures_util::stream::BoxStream;
use std::sync::Weak;

/// Frames of one push session. An `Err` item ends the session.
pub type SnapshotFrames = BoxStream<'static, SyncResult<Snapshot>>;

/// One-shot snapshot fetch (the pull endpoint).
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> SyncResult<Snapshot>;
}

/// Opens a push session. Resolves once the stream is open.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self) -> SyncResult<SnapshotFrames>;
}

/// A snapshot acquisition strategy.
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Begin acquiring. Calling `start` while already started does nothing.
    fn start(&self, sink: TransportSink);

    /// Stop acquiring and cancel every timer and in-flight task. Idempotent.
    fn stop(&self);

    /// Acquire one snapshot out of band. Streaming transports ignore this.
    fn refresh(&self) {}

    fn is_running(&self) -> bool;
}

/// Dispatch-order tag for a snapshot request.
///
/// Issued before the request goes out; a result is applied only if its
/// ticket is newer than the last applied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(pub(crate) u64);

impl RequestTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// The engine side of a sink.
pub(crate) trait SinkTarget: Send + Sync {
    fn is_current(&self, generation: u64) -> bool;
    fn begin_request(&self, generation: u64) -> Option<RequestTicket>;
    fn deliver(&self, generation: u64, ticket: RequestTicket, snapshot: Snapshot);
    fn report_state(&self, generation: u64, state: ConnectionState);
    fn report_error(&self, generation: u64, error: &SyncError);
}

/// Handle a transport uses to report back to the engine.
#[derive(Clone)]
pub struct TransportSink {
    target: Weak<dyn SinkTarget>,
    generation: u64,
}

impl TransportSink {
    pub(crate) fn new(target: Weak<dyn SinkTarget>, generation: u64) -> Self {
        Self { target, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while the engine that issued this sink is open and has not been
    /// restarted since.
    pub fn is_current(&self) -> bool {
        self.target
            .upgrade()
            .is_some_and(|target| target.is_current(self.generation))
    }

    /// Tag a request about to be dispatched. `None` once the sink is stale.
    pub fn begin_request(&self) -> Option<RequestTicket> {
        self.target.upgrade()?.begin_request(self.generation)
    }

    pub fn deliver(&self, ticket: RequestTicket, snapshot: Snapshot) {
        if let Some(target) = self.target.upgrade() {
            target.deliver(self.generation, ticket, snapshot);
        }
    }

    pub fn report_state(&self, state: ConnectionState) {
        if let Some(target) = self.target.upgrade() {
            target.report_state(self.generation, state);
        }
    }

    pub fn report_error(&self, error: &SyncError) {
        if let Some(target) = self.target.upgrade() {
            target.report_error(self.generation, error);
        }
    }
}

impl std::fmt::Debug for TransportSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSink")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
