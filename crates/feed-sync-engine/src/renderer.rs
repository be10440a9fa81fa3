//! Presentation seam.

use crate::error::SyncError;
use crate::state::ConnectionState;
use feed_protocol_types::{Message, MessageId};

/// Whatever draws the feed.
///
/// The engine calls these while it holds its own state lock, so callbacks
/// arrive one at a time and never after `SyncEngine::close` has returned.
/// Implementations must not call back into the engine.
pub trait Renderer: Send + Sync {
    /// Redraw the whole message window, newest first.
    fn render(&self, messages: &[Message]);

    /// Play the new-message cue.
    fn notify_new_message(&self);

    /// Show the error indicator.
    fn show_error(&self, error: &SyncError);

    /// Drop one message from the window after a confirmed delete.
    fn remove_message(&self, _id: &MessageId) {}

    fn connection_changed(&self, _state: ConnectionState) {}
}
