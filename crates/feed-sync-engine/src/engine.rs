//! The sync engine: owns the store and the chosen transport, and is the only
//! thing that talks to the renderer.

use crate::error::SyncError;
use crate::renderer::Renderer;
use crate::scheduler::ReconnectScheduler;
use crate::settings::SyncSettings;
use crate::state::ConnectionState;
use crate::store::MessageStore;
use crate::transport::{
    PullTransport, PushSettings, PushTransport, RequestTicket, SinkTarget, SnapshotSource,
    StreamConnector, Transport, TransportSink,
};
use feed_config_and_utils::TransportKind;
use feed_protocol_types::{Message, MessageId, Snapshot};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Live feed controller.
///
/// Cheap to clone; clones share the same engine. `open` and `close` follow
/// widget visibility and may be called any number of times in any order.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    settings: SyncSettings,
    transport: Arc<dyn Transport>,
    scheduler: Arc<ReconnectScheduler>,
    renderer: Arc<dyn Renderer>,
    /// Serializes `open` and `close`.
    lifecycle: Mutex<()>,
    state: Mutex<EngineState>,
}

#[derive(Default)]
struct EngineState {
    open: bool,
    /// Bumped on every open and close; sinks from older generations are dead.
    generation: u64,
    connection: ConnectionState,
    next_ticket: u64,
    last_applied_ticket: u64,
    store: MessageStore,
}

impl SyncEngine {
    /// Build an engine whose transport (chosen by `settings`) talks to `client`.
    pub fn new<C>(
        settings: SyncSettings,
        client: Arc<C>,
        renderer: Arc<dyn Renderer>,
        runtime: Handle,
    ) -> Self
    where
        C: SnapshotSource + StreamConnector + 'static,
    {
        let scheduler = ReconnectScheduler::new(runtime.clone());
        let transport: Arc<dyn Transport> = match settings.transport {
            TransportKind::Pull => Arc::new(PullTransport::new(
                client,
                settings.poll_interval,
                runtime,
            )),
            TransportKind::Push => Arc::new(PushTransport::new(
                client,
                scheduler.clone(),
                PushSettings::from(&settings),
                runtime,
            )),
        };
        Self::with_transport(settings, transport, scheduler, renderer)
    }

    pub(crate) fn with_transport(
        settings: SyncSettings,
        transport: Arc<dyn Transport>,
        scheduler: Arc<ReconnectScheduler>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                settings,
                transport,
                scheduler,
                renderer,
                lifecycle: Mutex::new(()),
                state: Mutex::new(EngineState::default()),
            }),
        }
    }

    /// Start syncing. Does nothing if already open.
    ///
    /// Every open starts from an empty store, so the first non-empty
    /// snapshot after an open always plays the new-message cue.
    pub fn open(&self) {
        let _lifecycle = self.inner.lifecycle.lock();

        let sink = {
            let mut state = self.inner.state.lock();
            if state.open {
                debug!("Feed already open");
                return;
            }
            state.open = true;
            state.generation += 1;
            state.store = MessageStore::new();
            self.inner.set_connection(&mut state, ConnectionState::Connecting);

            let target: Arc<dyn SinkTarget> = self.inner.clone();
            TransportSink::new(Arc::downgrade(&target), state.generation)
        };

        info!(
            transport = %self.inner.transport.kind(),
            generation = sink.generation(),
            "Opening live feed"
        );
        self.inner.transport.start(sink);
    }

    /// Stop syncing.
    ///
    /// Once this returns, no pending fetch, frame or timer from the closed
    /// run reaches the store or the renderer.
    pub fn close(&self) {
        let _lifecycle = self.inner.lifecycle.lock();

        {
            let mut state = self.inner.state.lock();
            if !state.open {
                return;
            }
            state.open = false;
            state.generation += 1;
        }

        self.inner.transport.stop();
        self.inner.scheduler.disarm();

        let mut state = self.inner.state.lock();
        self.inner.set_connection(&mut state, ConnectionState::Closed);
        info!("Live feed closed");
    }

    /// Ask for a fresh snapshot now. Only the pull strategy acts on this;
    /// the push stream delivers changes by itself.
    pub fn refresh(&self) {
        if !self.is_open() {
            return;
        }
        self.inner.transport.refresh();
    }

    /// Reflect a confirmed delete without waiting for the next snapshot.
    pub fn message_deleted(&self, id: &MessageId) {
        self.inner.renderer.remove_message(id);
        self.refresh();
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.lock().open
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    /// Messages currently on screen, newest first.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.lock().store.messages().to_vec()
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.inner.transport.kind()
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("transport", &self.inner.transport.kind())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl EngineInner {
    fn set_connection(&self, state: &mut EngineState, next: ConnectionState) {
        if state.connection == next {
            return;
        }
        debug!(from = %state.connection, to = %next, "Connection state changed");
        state.connection = next;
        self.renderer.connection_changed(next);
    }
}

fn is_live(state: &EngineState, generation: u64) -> bool {
    state.open && state.generation == generation
}

impl SinkTarget for EngineInner {
    fn is_current(&self, generation: u64) -> bool {
        is_live(&self.state.lock(), generation)
    }

    fn begin_request(&self, generation: u64) -> Option<RequestTicket> {
        let mut state = self.state.lock();
        if !is_live(&state, generation) {
            return None;
        }
        state.next_ticket += 1;
        Some(RequestTicket(state.next_ticket))
    }

    fn deliver(&self, generation: u64, ticket: RequestTicket, snapshot: Snapshot) {
        let mut state = self.state.lock();
        if !is_live(&state, generation) {
            debug!(generation, "Dropping snapshot from a closed run");
            return;
        }
        if ticket.0 <= state.last_applied_ticket {
            debug!(
                ticket = ticket.0,
                last_applied = state.last_applied_ticket,
                "Dropping out-of-order snapshot"
            );
            return;
        }
        state.last_applied_ticket = ticket.0;

        let outcome = state.store.accept(snapshot);
        if outcome.changed {
            self.renderer.render(state.store.messages());
        }
        if outcome.has_newer {
            self.renderer.notify_new_message();
        }
    }

    fn report_state(&self, generation: u64, next: ConnectionState) {
        let mut state = self.state.lock();
        if is_live(&state, generation) {
            self.set_connection(&mut state, next);
        }
    }

    fn report_error(&self, generation: u64, error: &SyncError) {
        let state = self.state.lock();
        if !is_live(&state, generation) {
            return;
        }

        // Polling hides errors once anything has been on screen; a broken
        // stream is always shown.
        let visible = match self.settings.transport {
            TransportKind::Pull => !state.store.has_held_messages(),
            TransportKind::Push => true,
        };
        if visible {
            self.renderer.show_error(error);
        } else {
            warn!(error = %error, "Sync error hidden behind last snapshot");
        }
    }
}
