//! `livefeed watch`: follow the feed and post typed lines.

use super::channel;
use crate::input::{self, WatchInput};
use crate::renderer::TerminalRenderer;
use feed_config_and_utils::{FeedConfig, TransportKind};
use feed_http_client::FeedClient;
use feed_sync_engine::{CommandChannel, SyncEngine, SyncSettings};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tracing::info;

pub async fn run(
    config: FeedConfig,
    transport: Option<TransportKind>,
    admin: bool,
) -> anyhow::Result<()> {
    let mut settings = SyncSettings::from_config(&config);
    if let Some(kind) = transport {
        settings = settings.with_transport(kind);
    }

    let client = Arc::new(FeedClient::new(&config)?);
    let engine = SyncEngine::new(
        settings,
        client.clone(),
        Arc::new(TerminalRenderer::new()),
        Handle::current(),
    );
    let commands = channel(&config, client, engine.clone(), admin);

    info!(
        base_url = %config.base_url,
        transport = %engine.transport_kind(),
        admin,
        "Watching feed"
    );
    eprintln!(
        "Watching {} ({}). Type /help for commands.",
        config.base_url,
        engine.transport_kind()
    );
    engine.open();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => handle_line(&commands, &line).await,
                    None => break,
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    engine.close();
    Ok(())
}

/// Run one typed line. Failures are printed; the watch keeps going.
async fn handle_line(commands: &CommandChannel, line: &str) {
    let result = match input::parse(line) {
        WatchInput::Nothing => Ok(()),
        WatchInput::Help => {
            println!("{}", input::HELP);
            Ok(())
        }
        WatchInput::Invalid(usage) => {
            eprintln!("{}", usage);
            Ok(())
        }
        WatchInput::Send(text) => commands.send(&text, None).await,
        WatchInput::Delete(id) => commands.delete(&id).await,
        WatchInput::Upload { path, caption } => match commands.upload_image(&path).await {
            Ok(url) => commands.send(&caption, Some(url)).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }
}
