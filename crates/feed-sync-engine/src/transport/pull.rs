//! Periodic polling of the listing endpoint.

use super::{SnapshotSource, Transport, TransportSink};
use crate::error::SyncError;
use crate::state::ConnectionState;
use feed_config_and_utils::TransportKind;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Fetches the full snapshot immediately on start and then every interval.
///
/// A failed fetch keeps whatever is on screen; the next tick simply tries
/// again at the same cadence. A fetch that outlives the interval is abandoned
/// so a stalled request cannot hold up the ticker.
pub struct PullTransport {
    source: Arc<dyn SnapshotSource>,
    interval: Duration,
    runtime: Handle,
    running: Mutex<Option<PullRun>>,
}

struct PullRun {
    sink: TransportSink,
    ticker: JoinHandle<()>,
    refreshes: Vec<JoinHandle<()>>,
}

impl PullTransport {
    pub fn new(source: Arc<dyn SnapshotSource>, interval: Duration, runtime: Handle) -> Self {
        Self {
            source,
            interval,
            runtime,
            running: Mutex::new(None),
        }
    }
}

impl Transport for PullTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Pull
    }

    fn start(&self, sink: TransportSink) {
        let mut running = self.running.lock();
        if running.is_some() {
            debug!("Pull transport already running");
            return;
        }

        info!(
            interval_ms = self.interval.as_millis() as u64,
            generation = sink.generation(),
            "Starting pull transport"
        );

        let ticker = self.runtime.spawn(poll_loop(
            self.source.clone(),
            sink.clone(),
            self.interval,
        ));
        *running = Some(PullRun {
            sink,
            ticker,
            refreshes: Vec::new(),
        });
    }

    fn stop(&self) {
        let Some(run) = self.running.lock().take() else {
            return;
        };

        run.ticker.abort();
        for refresh in run.refreshes {
            refresh.abort();
        }
        info!("Pull transport stopped");
    }

    fn refresh(&self) {
        let mut running = self.running.lock();
        let Some(run) = running.as_mut() else {
            debug!("Refresh requested while stopped");
            return;
        };

        run.refreshes.retain(|task| !task.is_finished());

        let source = self.source.clone();
        let sink = run.sink.clone();
        let deadline = self.interval;
        run.refreshes.push(self.runtime.spawn(async move {
            fetch_once(source.as_ref(), &sink, deadline).await;
        }));
    }

    fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

async fn poll_loop(source: Arc<dyn SnapshotSource>, sink: TransportSink, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !sink.is_current() {
            debug!(generation = sink.generation(), "Poll loop outlived its engine");
            break;
        }
        fetch_once(source.as_ref(), &sink, interval).await;
    }
}

async fn fetch_once(source: &dyn SnapshotSource, sink: &TransportSink, deadline: Duration) {
    let Some(ticket) = sink.begin_request() else {
        return;
    };

    let result = match tokio::time::timeout(deadline, source.fetch_snapshot()).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::Transport(format!(
            "poll timed out after {} ms",
            deadline.as_millis()
        ))),
    };

    match result {
        Ok(snapshot) => {
            debug!(ticket = ticket.value(), count = snapshot.len(), "Poll succeeded");
            sink.report_state(ConnectionState::Open);
            sink.deliver(ticket, snapshot);
        }
        Err(e) => {
            warn!(
                ticket = ticket.value(),
                decode = e.is_decode(),
                error = %e,
                "Poll failed, keeping last snapshot"
            );
            sink.report_state(ConnectionState::Error);
            sink.report_error(&e);
        }
    }
}
