//! HTTP client for the livefeed server endpoints.
//!
//! # Endpoints
//!
//! ```text
//! GET    {messages}?t=<millis>   -> [Message, ...] newest first
//! GET    {stream}                -> text/event-stream, `new_comment` events
//! POST   {send}                  -> {success, error?}
//! DELETE {delete}/{id}           -> {success, error?}
//! POST   {upload} (multipart)    -> {success, url?, error?}
//! ```
//!
//! The client performs no retries. Recovery policy belongs to the sync
//! engine (transient failures) and to the user (rejected commands).

mod client;
mod error;
mod sse;

pub use client::{FeedClient, SnapshotStream};
pub use error::{ClientError, ClientResult};
pub use sse::{SseDecoder, SseEvent};
