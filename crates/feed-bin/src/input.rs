//! Parsing of lines typed while watching.

use feed_protocol_types::MessageId;
use std::path::PathBuf;

/// What a typed line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchInput {
    /// Blank line.
    Nothing,
    Send(String),
    Delete(MessageId),
    Upload {
        path: PathBuf,
        caption: String,
    },
    Help,
    /// A slash command that could not be parsed; carries the usage hint.
    Invalid(&'static str),
}

pub const HELP: &str = "\
Commands:
  <text>                     post a message
  /upload <path> [caption]   upload an image and post it
  /delete <id>               delete a message (admin only)
  /help                      show this help";

pub fn parse(line: &str) -> WatchInput {
    let line = line.trim();
    if line.is_empty() {
        return WatchInput::Nothing;
    }
    if !line.starts_with('/') {
        return WatchInput::Send(line.to_string());
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "/delete" => match rest.split_whitespace().next() {
            Some(id) => WatchInput::Delete(MessageId::new(id)),
            None => WatchInput::Invalid("usage: /delete <id>"),
        },
        "/upload" => {
            let (path, caption) = match rest.split_once(char::is_whitespace) {
                Some((path, caption)) => (path, caption.trim()),
                None => (rest, ""),
            };
            if path.is_empty() {
                return WatchInput::Invalid("usage: /upload <path> [caption]");
            }
            WatchInput::Upload {
                path: PathBuf::from(path),
                caption: caption.to_string(),
            }
        }
        "/help" => WatchInput::Help,
        _ => WatchInput::Invalid("unknown command, try /help"),
    }
}
