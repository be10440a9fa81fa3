//! One-shot commands: send, delete, upload.

use super::channel;
use crate::renderer::TerminalRenderer;
use feed_config_and_utils::FeedConfig;
use feed_http_client::FeedClient;
use feed_protocol_types::MessageId;
use feed_sync_engine::{CommandChannel, SyncEngine, SyncSettings};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;

fn detached_channel(config: &FeedConfig, admin: bool) -> anyhow::Result<CommandChannel> {
    let client = Arc::new(FeedClient::new(config)?);
    let engine = SyncEngine::new(
        SyncSettings::from_config(config),
        client.clone(),
        Arc::new(TerminalRenderer::new()),
        Handle::current(),
    );
    Ok(channel(config, client, engine, admin))
}

pub async fn send(
    config: &FeedConfig,
    text: &str,
    image_url: Option<String>,
) -> anyhow::Result<()> {
    let channel = detached_channel(config, false)?;
    channel.send(text, image_url).await?;
    println!("Message sent");
    Ok(())
}

pub async fn delete(config: &FeedConfig, id: &str, admin: bool) -> anyhow::Result<()> {
    let channel = detached_channel(config, admin)?;
    channel.delete(&MessageId::new(id)).await?;
    Ok(())
}

pub async fn upload(config: &FeedConfig, path: &Path) -> anyhow::Result<()> {
    let channel = detached_channel(config, false)?;
    let url = channel.upload_image(path).await?;
    println!("{}", url);
    Ok(())
}
