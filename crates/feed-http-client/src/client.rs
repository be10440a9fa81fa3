//! Feed REST and event-stream client.

use crate::error::{ClientError, ClientResult};
use crate::sse::{SseDecoder, SseEvent};
use feed_config_and_utils::{EndpointConfig, FeedConfig};
use feed_protocol_types::{
    is_snapshot_event, CommandResponse, MessageId, SendMessageRequest, Snapshot, UploadResponse,
    UPLOAD_FIELD,
};
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// Snapshots decoded from one event-stream session.
///
/// Yields an error item when the connection breaks or ends; nothing follows it.
pub type SnapshotStream = BoxStream<'static, ClientResult<Snapshot>>;

/// Query parameter that defeats intermediary caches on the listing endpoint.
const CACHE_BUST_PARAM: &str = "t";

/// Client for the feed endpoints.
#[derive(Clone)]
pub struct FeedClient {
    http_client: reqwest::Client,
    base_url: Url,
    endpoints: EndpointConfig,
    request_timeout: Duration,
}

impl FeedClient {
    /// Create a client for the endpoints in `config`.
    ///
    /// Only the connect phase has a client-wide deadline; the event stream
    /// body is open-ended. Every other request carries `request_timeout`.
    pub fn new(config: &FeedConfig) -> ClientResult<Self> {
        let request_timeout = config.request_timeout();
        let http_client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url()?,
            endpoints: config.endpoints.clone(),
            request_timeout,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Config(e.into()))
    }

    /// Listing URL tagged with the given wall-clock time.
    pub fn messages_url(&self, now_millis: i64) -> ClientResult<Url> {
        let mut url = self.url(&self.endpoints.messages)?;
        url.query_pairs_mut()
            .append_pair(CACHE_BUST_PARAM, &now_millis.to_string());
        Ok(url)
    }

    /// Fetch the current snapshot from the listing endpoint.
    pub async fn fetch_messages(&self) -> ClientResult<Snapshot> {
        let url = self.messages_url(chrono::Utc::now().timestamp_millis())?;

        let response = self
            .http_client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response.text().await?;
        let snapshot = Snapshot::from_json(&body)?;

        debug!(count = snapshot.len(), "Fetched message snapshot");
        Ok(snapshot)
    }

    /// Open the event stream.
    ///
    /// Returns once the response headers arrive, which is the open signal
    /// for the session. Only `new_comment` and default events are decoded.
    pub async fn open_stream(&self) -> ClientResult<SnapshotStream> {
        let url = self.url(&self.endpoints.stream)?;

        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let response = check_status(response).await?;

        debug!("Event stream opened");

        let state = StreamState {
            bytes: response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        };

        Ok(stream::unfold(state, next_snapshot).boxed())
    }

    /// Post a new message.
    pub async fn send_message(&self, request: &SendMessageRequest) -> ClientResult<()> {
        let url = self.url(&self.endpoints.send)?;

        debug!(
            text_len = request.text.len(),
            has_image = request.image_url.is_some(),
            "Sending message"
        );

        let response = self
            .http_client
            .post(url)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await?;
        let envelope: CommandResponse = read_envelope(response).await?;
        ensure_success(envelope.success, envelope.error)
    }

    /// Delete one message.
    pub async fn delete_message(&self, message_id: &MessageId) -> ClientResult<()> {
        let path = self.endpoints.delete_path(message_id.as_str())?;
        let url = self.url(&path)?;

        debug!(message_id = %message_id, "Deleting message");

        let response = self
            .http_client
            .delete(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let envelope: CommandResponse = read_envelope(response).await?;
        ensure_success(envelope.success, envelope.error)
    }

    /// Upload an image; returns the URL to attach to a later send.
    pub async fn upload_image(
        &self,
        file_name: String,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> ClientResult<String> {
        let url = self.url(&self.endpoints.upload)?;

        debug!(file_name = %file_name, size = bytes.len(), mime_type, "Uploading image");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http_client
            .post(url)
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await?;
        let envelope: UploadResponse = read_envelope(response).await?;
        ensure_success(envelope.success, envelope.error)?;

        envelope
            .url
            .ok_or_else(|| ClientError::Rejected("Upload response carried no URL".to_string()))
    }
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

struct StreamState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    finished: bool,
}

async fn next_snapshot(
    mut state: StreamState,
) -> Option<(ClientResult<Snapshot>, StreamState)> {
    loop {
        if let Some(event) = state.pending.pop_front() {
            if !is_snapshot_event(&event.event) {
                debug!(event = %event.event, event_id = ?event.id, "Ignoring stream event");
                continue;
            }
            debug!(event_id = ?event.id, bytes = event.data.len(), "Stream snapshot received");
            let item = Snapshot::from_json(&event.data).map_err(ClientError::from);
            return Some((item, state));
        }

        if state.finished {
            return None;
        }

        match state.bytes.next().await {
            Some(Ok(chunk)) => {
                let events = state.decoder.feed(&chunk);
                state.pending.extend(events);
            }
            Some(Err(e)) => {
                state.finished = true;
                return Some((Err(ClientError::Http(e)), state));
            }
            None => {
                state.finished = true;
                return Some((Err(ClientError::StreamClosed), state));
            }
        }
    }
}

/// Turn a non-2xx response into `ClientError::Api`.
async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!("Feed request failed: {} - {}", status, body);
    Err(ClientError::Api {
        status,
        message: body,
    })
}

/// Decode a `{success, error?}` style envelope.
///
/// Servers also use the envelope on error statuses, so it is tried first;
/// only a body that is not an envelope becomes `ClientError::Api`.
async fn read_envelope<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> ClientResult<T> {
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<T>(&body) {
        Ok(envelope) => Ok(envelope),
        Err(e) if status.is_success() => Err(ClientError::Json(e)),
        Err(_) => {
            error!("Command request failed: {} - {}", status.as_u16(), body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

fn ensure_success(success: bool, error: Option<String>) -> ClientResult<()> {
    if success {
        Ok(())
    } else {
        Err(ClientError::Rejected(
            error.unwrap_or_else(|| "Request rejected by server".to_string()),
        ))
    }
}
