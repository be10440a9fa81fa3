//! The HTTP client as a snapshot source and stream connector.

use super::{SnapshotFrames, SnapshotSource, StreamConnector};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use feed_http_client::FeedClient;
use feed_protocol_types::Snapshot;
use futures_util::StreamExt;

#[async_trait]
impl SnapshotSource for FeedClient {
    async fn fetch_snapshot(&self) -> SyncResult<Snapshot> {
        Ok(self.fetch_messages().await?)
    }
}

#[async_trait]
impl StreamConnector for FeedClient {
    async fn connect(&self) -> SyncResult<SnapshotFrames> {
        let stream = self.open_stream().await?;
        Ok(stream.map(|item| item.map_err(SyncError::from)).boxed())
    }
}
