//! Plain terminal rendering of the feed.

use chrono::Local;
use feed_protocol_types::{Message, MessageId};
use feed_sync_engine::{ConnectionState, Renderer, SyncError};
use std::io::{self, Write};

/// Prints the whole window on every change, newest first.
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for TerminalRenderer {
    fn render(&self, messages: &[Message]) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "\n{}", "-".repeat(50));
        if messages.is_empty() {
            let _ = writeln!(out, "  (no messages yet)");
        }
        for message in messages {
            let _ = writeln!(out, "{}", format_message(message));
        }
        let _ = writeln!(out, "{}", "-".repeat(50));
        let _ = out.flush();
    }

    fn notify_new_message(&self) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "\x07");
        let _ = out.flush();
    }

    fn show_error(&self, error: &SyncError) {
        eprintln!("! Feed unavailable: {}", error);
    }

    fn remove_message(&self, id: &MessageId) {
        println!("Message #{} deleted", id);
    }

    fn connection_changed(&self, state: ConnectionState) {
        match state {
            ConnectionState::Reconnecting => eprintln!("~ reconnecting..."),
            ConnectionState::Closed => eprintln!("~ feed closed"),
            _ => {}
        }
    }
}

/// One line per message: local time, id, admin badge, text, image.
pub fn format_message(message: &Message) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M:%S");
    let mut line = format!("[{}] #{}", time, message.id);
    if message.is_admin {
        line.push_str(" (admin)");
    }
    if !message.text.is_empty() {
        line.push(' ');
        line.push_str(&message.text);
    }
    if let Some(url) = &message.image_url {
        line.push_str(&format!(" [image: {}]", url));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(text: &str, image_url: Option<&str>, is_admin: bool) -> Message {
        Message {
            id: MessageId::from(12),
            text: text.to_string(),
            image_url: image_url.map(str::to_string),
            is_admin,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_format_text_message() {
        let line = format_message(&message("hello", None, false));
        assert!(line.ends_with("#12 hello"));
        assert!(line.starts_with('['));
    }

    #[test]
    fn test_format_admin_image_message() {
        let line = format_message(&message("", Some("/uploads/cat.png"), true));
        assert!(line.ends_with("#12 (admin) [image: /uploads/cat.png]"));
    }
}
