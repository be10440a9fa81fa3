//! The last accepted snapshot and the newest timestamp seen so far.

use chrono::{DateTime, Utc};
use feed_protocol_types::{Message, Snapshot};

/// What accepting a snapshot means for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Acceptance {
    /// The snapshot differs from the previous one and must be re-rendered.
    pub changed: bool,
    /// The newest message is strictly newer than anything seen before.
    pub has_newer: bool,
}

/// Holds what is on screen.
///
/// Lives for one engine run; reopening the engine starts from a fresh store.
#[derive(Debug, Default)]
pub struct MessageStore {
    last_snapshot: Option<Snapshot>,
    last_seen: Option<DateTime<Utc>>,
    held_messages: bool,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a freshly acquired snapshot.
    ///
    /// An identical snapshot changes nothing. Any non-empty snapshot updates
    /// the newest-seen timestamp, which never moves backwards.
    pub fn accept(&mut self, snapshot: Snapshot) -> Acceptance {
        if self.last_snapshot.as_ref() == Some(&snapshot) {
            return Acceptance::default();
        }

        let newest = snapshot.newest().map(|m| m.timestamp);
        let has_newer = match (newest, self.last_seen) {
            (Some(ts), Some(seen)) => ts > seen,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if let Some(ts) = newest {
            self.last_seen = Some(self.last_seen.map_or(ts, |seen| seen.max(ts)));
            self.held_messages = true;
        }
        self.last_snapshot = Some(snapshot);

        Acceptance {
            changed: true,
            has_newer,
        }
    }

    /// Messages currently on screen, newest first.
    pub fn messages(&self) -> &[Message] {
        self.last_snapshot
            .as_ref()
            .map(Snapshot::messages)
            .unwrap_or(&[])
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    /// True once any non-empty snapshot has been accepted.
    pub fn has_held_messages(&self) -> bool {
        self.held_messages
    }
}
