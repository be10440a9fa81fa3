//! Engine lifecycle: generation guard, request ordering, error visibility.

use super::harness::{capturing_engine, snapshot};
use crate::error::SyncError;
use crate::state::ConnectionState;
use crate::transport::Transport;
use feed_config_and_utils::TransportKind;

#[tokio::test]
async fn open_and_close_are_idempotent() {
    let (engine, transport, renderer) = capturing_engine(TransportKind::Pull);
    assert_eq!(engine.state(), ConnectionState::Idle);

    engine.close();
    engine.open();
    engine.open();
    assert_eq!(transport.starts(), 1);
    assert!(transport.is_running());

    engine.close();
    engine.close();
    assert!(!transport.is_running());
    assert_eq!(
        renderer.states(),
        vec![ConnectionState::Connecting, ConnectionState::Closed]
    );
}

#[tokio::test]
async fn stale_sink_is_ignored_after_close() {
    let (engine, transport, renderer) = capturing_engine(TransportKind::Pull);
    engine.open();
    let sink = transport.sink();
    let ticket = sink.begin_request().unwrap();

    engine.close();

    assert!(!sink.is_current());
    assert!(sink.begin_request().is_none());
    sink.deliver(ticket, snapshot(&[(1, 100)]));
    sink.report_error(&SyncError::StreamEnded);
    sink.report_state(ConnectionState::Open);

    assert!(renderer.renders().is_empty());
    assert!(renderer.errors().is_empty());
    assert_eq!(renderer.notifications(), 0);
    assert_eq!(engine.state(), ConnectionState::Closed);
    assert!(engine.messages().is_empty());
}

#[tokio::test]
async fn sink_from_previous_run_is_ignored_after_reopen() {
    let (engine, transport, renderer) = capturing_engine(TransportKind::Pull);
    engine.open();
    let old_sink = transport.sink();
    let old_ticket = old_sink.begin_request().unwrap();

    engine.close();
    engine.open();
    let new_sink = transport.sink();
    assert_ne!(old_sink.generation(), new_sink.generation());

    old_sink.deliver(old_ticket, snapshot(&[(1, 100)]));
    assert!(renderer.renders().is_empty());

    let ticket = new_sink.begin_request().unwrap();
    new_sink.deliver(ticket, snapshot(&[(2, 200)]));
    assert_eq!(renderer.renders(), vec![vec!["2".to_string()]]);
}

#[tokio::test]
async fn older_request_landing_late_is_discarded() {
    let (engine, transport, renderer) = capturing_engine(TransportKind::Pull);
    engine.open();
    let sink = transport.sink();

    let first = sink.begin_request().unwrap();
    let second = sink.begin_request().unwrap();
    assert!(second > first);

    sink.deliver(second, snapshot(&[(2, 200), (1, 100)]));
    sink.deliver(first, snapshot(&[(1, 100)]));

    assert_eq!(renderer.renders().len(), 1);
    assert_eq!(engine.messages().len(), 2);
}

#[tokio::test]
async fn first_snapshot_after_reopen_plays_cue_again() {
    let (engine, transport, renderer) = capturing_engine(TransportKind::Pull);

    engine.open();
    let sink = transport.sink();
    sink.deliver(sink.begin_request().unwrap(), snapshot(&[(1, 100)]));
    engine.close();

    engine.open();
    let sink = transport.sink();
    sink.deliver(sink.begin_request().unwrap(), snapshot(&[(1, 100)]));

    assert_eq!(renderer.renders().len(), 2);
    assert_eq!(renderer.notifications(), 2);
}

#[tokio::test]
async fn pull_error_hidden_once_messages_were_shown() {
    let (engine, transport, renderer) = capturing_engine(TransportKind::Pull);
    engine.open();
    let sink = transport.sink();

    sink.report_error(&SyncError::Transport("down".to_string()));
    assert_eq!(renderer.errors().len(), 1);

    sink.deliver(sink.begin_request().unwrap(), snapshot(&[(1, 100)]));
    sink.report_error(&SyncError::Transport("down".to_string()));
    assert_eq!(renderer.errors().len(), 1);

    // An empty list afterwards does not bring the indicator back.
    sink.deliver(sink.begin_request().unwrap(), snapshot(&[]));
    sink.report_error(&SyncError::Transport("down".to_string()));
    assert_eq!(renderer.errors().len(), 1);
}

#[tokio::test]
async fn push_error_always_shown() {
    let (engine, transport, renderer) = capturing_engine(TransportKind::Push);
    engine.open();
    let sink = transport.sink();

    sink.deliver(sink.begin_request().unwrap(), snapshot(&[(1, 100)]));
    sink.report_error(&SyncError::StreamEnded);
    sink.report_error(&SyncError::StreamEnded);
    assert_eq!(renderer.errors().len(), 2);
}

#[tokio::test]
async fn refresh_reaches_transport_only_while_open() {
    let (engine, transport, _renderer) = capturing_engine(TransportKind::Pull);

    engine.refresh();
    assert_eq!(transport.refreshes(), 0);

    engine.open();
    engine.refresh();
    assert_eq!(transport.refreshes(), 1);
}

#[tokio::test]
async fn repeated_state_reports_are_collapsed() {
    let (engine, transport, renderer) = capturing_engine(TransportKind::Push);
    engine.open();
    let sink = transport.sink();

    sink.report_state(ConnectionState::Open);
    sink.report_state(ConnectionState::Open);
    sink.report_state(ConnectionState::Reconnecting);

    assert_eq!(
        renderer.states(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Reconnecting
        ]
    );
}
