//! Timing and strategy settings, resolved once from configuration.

use feed_config_and_utils::{FeedConfig, TransportKind};
use std::time::Duration;

/// Immutable engine settings.
///
/// The transport choice is fixed for the lifetime of an engine; there is no
/// fallback from one strategy to the other at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub transport: TransportKind,
    pub poll_interval: Duration,
    pub max_session_lifetime: Duration,
    pub reconnect_delay: Duration,
    pub lifetime_reconnect_enabled: bool,
}

impl SyncSettings {
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            transport: config.transport,
            poll_interval: config.poll_interval(),
            max_session_lifetime: config.max_session_lifetime(),
            reconnect_delay: config.reconnect_delay(),
            lifetime_reconnect_enabled: config.lifetime_reconnect_enabled,
        }
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&FeedConfig::default())
    }
}
