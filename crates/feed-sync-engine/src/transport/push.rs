//! Server-push sessions over the event stream.

use super::{StreamConnector, Transport, TransportSink};
use crate::error::SyncError;
use crate::scheduler::ReconnectScheduler;
use crate::settings::SyncSettings;
use crate::state::ConnectionState;
use feed_config_and_utils::TransportKind;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Session timing for the push strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushSettings {
    pub max_session_lifetime: Duration,
    pub reconnect_delay: Duration,
    pub lifetime_reconnect_enabled: bool,
}

impl From<&SyncSettings> for PushSettings {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            max_session_lifetime: settings.max_session_lifetime,
            reconnect_delay: settings.reconnect_delay,
            lifetime_reconnect_enabled: settings.lifetime_reconnect_enabled,
        }
    }
}

/// Keeps exactly one stream session open while started.
///
/// A session that errors or ends is torn down and replaced after the
/// reconnect delay. With lifetime reconnect enabled, a session that stays
/// silent for the maximum lifetime is cycled the same way.
pub struct PushTransport {
    shared: Arc<PushShared>,
}

struct PushShared {
    connector: Arc<dyn StreamConnector>,
    scheduler: Arc<ReconnectScheduler>,
    settings: PushSettings,
    runtime: Handle,
    state: Mutex<PushState>,
}

#[derive(Default)]
struct PushState {
    sink: Option<TransportSink>,
    session: Option<Session>,
    next_session_id: u64,
}

/// One open stream.
struct Session {
    id: u64,
    created_at: Instant,
    task: JoinHandle<()>,
}

impl PushTransport {
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        scheduler: Arc<ReconnectScheduler>,
        settings: PushSettings,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(PushShared {
                connector,
                scheduler,
                settings,
                runtime,
                state: Mutex::new(PushState::default()),
            }),
        }
    }
}

impl Transport for PushTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Push
    }

    fn start(&self, sink: TransportSink) {
        {
            let mut state = self.shared.state.lock();
            if state.sink.is_some() {
                debug!("Push transport already running");
                return;
            }
            info!(generation = sink.generation(), "Starting push transport");
            state.sink = Some(sink);
        }
        self.shared.open_session();
    }

    fn stop(&self) {
        let session = {
            let mut state = self.shared.state.lock();
            if state.sink.take().is_none() {
                return;
            }
            state.session.take()
        };

        if let Some(session) = session {
            debug!(session_id = session.id, "Closing stream session");
            session.task.abort();
        }
        self.shared.scheduler.disarm();
        info!("Push transport stopped");
    }

    fn is_running(&self) -> bool {
        self.shared.state.lock().sink.is_some()
    }
}

impl PushShared {
    /// Open a session unless one is already open or the transport stopped.
    fn open_session(self: &Arc<Self>) {
        let mut state = self.state.lock();
        let Some(sink) = state.sink.clone() else {
            return;
        };
        if !sink.is_current() {
            return;
        }
        if let Some(session) = &state.session {
            debug!(session_id = session.id, "Session already open");
            return;
        }

        state.next_session_id += 1;
        let id = state.next_session_id;
        let task = self.runtime.spawn(run_session(self.clone(), id, sink));
        state.session = Some(Session {
            id,
            created_at: Instant::now(),
            task,
        });
    }

    /// Restart the lifetime countdown for session `id`.
    fn touch(self: &Arc<Self>, id: u64) {
        if !self.settings.lifetime_reconnect_enabled {
            return;
        }

        let shared: Weak<Self> = Arc::downgrade(self);
        self.scheduler
            .arm_lifetime(self.settings.max_session_lifetime, move || {
                if let Some(shared) = shared.upgrade() {
                    shared.session_expired(id);
                }
            });
    }

    /// Remove session `id` from the state. Returns the sink and the session
    /// if `id` was still the open session.
    fn take_session(&self, id: u64) -> Option<(TransportSink, Session)> {
        let mut state = self.state.lock();
        if state.session.as_ref().map(|s| s.id) != Some(id) {
            return None;
        }
        let session = state.session.take()?;
        let sink = state.sink.clone()?;
        Some((sink, session))
    }

    fn session_expired(self: &Arc<Self>, id: u64) {
        let Some((sink, session)) = self.take_session(id) else {
            return;
        };

        info!(
            session_id = id,
            age_ms = session.created_at.elapsed().as_millis() as u64,
            "Session lifetime reached, cycling stream"
        );
        session.task.abort();

        sink.report_state(ConnectionState::Reconnecting);
        self.schedule_reconnect(sink);
    }

    /// Called from the session task itself when its stream fails or ends.
    fn session_failed(self: &Arc<Self>, id: u64, error: SyncError) {
        // The handle is dropped, not aborted: this runs on that task.
        let Some((sink, _session)) = self.take_session(id) else {
            return;
        };
        self.scheduler.disarm_lifetime();

        warn!(
            session_id = id,
            decode = error.is_decode(),
            error = %error,
            "Stream session failed"
        );
        sink.report_state(ConnectionState::Error);
        sink.report_error(&error);

        if !sink.is_current() {
            return;
        }
        sink.report_state(ConnectionState::Reconnecting);
        self.schedule_reconnect(sink);
    }

    fn schedule_reconnect(self: &Arc<Self>, sink: TransportSink) {
        let delay = self.settings.reconnect_delay;
        debug!(delay_ms = delay.as_millis() as u64, "Reconnect scheduled");

        let shared: Weak<Self> = Arc::downgrade(self);
        self.scheduler.schedule_reconnect(delay, move || {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if sink.is_current() {
                shared.open_session();
            } else {
                debug!("Feed closed before reconnect, not reopening");
            }
        });
    }
}

async fn run_session(shared: Arc<PushShared>, id: u64, sink: TransportSink) {
    sink.report_state(ConnectionState::Connecting);

    let mut frames = match shared.connector.connect().await {
        Ok(frames) => frames,
        Err(e) => {
            shared.session_failed(id, e);
            return;
        }
    };

    info!(session_id = id, "Stream session open");
    sink.report_state(ConnectionState::Open);
    shared.touch(id);

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(snapshot) => {
                shared.touch(id);
                let Some(ticket) = sink.begin_request() else {
                    return;
                };
                sink.deliver(ticket, snapshot);
            }
            Err(e) => {
                shared.session_failed(id, e);
                return;
            }
        }
    }

    shared.session_failed(id, SyncError::StreamEnded);
}
