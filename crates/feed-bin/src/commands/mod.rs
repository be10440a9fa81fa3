//! Subcommand implementations.

pub mod oneshot;
pub mod watch;

use feed_config_and_utils::FeedConfig;
use feed_http_client::FeedClient;
use feed_sync_engine::{Capability, CommandChannel, CommandLimits, SyncEngine};
use std::sync::Arc;

/// Command channel for a one-shot command.
///
/// The engine is never opened, so the refresh after a command is a no-op.
fn channel(
    config: &FeedConfig,
    client: Arc<FeedClient>,
    engine: SyncEngine,
    admin: bool,
) -> CommandChannel {
    let capability = if admin {
        Capability::Admin
    } else {
        Capability::Member
    };
    CommandChannel::new(client, engine, capability, CommandLimits::from_config(config))
}
