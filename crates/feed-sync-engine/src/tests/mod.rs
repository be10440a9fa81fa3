//! Scenario tests for the sync engine.
//!
//! - `harness.rs`   - Mock feed server, recording renderer, mock command backend
//! - `lifecycle.rs` - Open/close, generation guard, request ordering, error visibility
//! - `pull.rs`      - Polling cadence, failures, out-of-band refresh
//! - `push.rs`      - Stream sessions, reconnect, forced session lifetime
//! - `commands.rs`  - Send, delete and upload validation
//!
//! Timer-driven tests run on a paused clock, so a 15 second poll interval
//! costs nothing.

mod commands;
mod lifecycle;
