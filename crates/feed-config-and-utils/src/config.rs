//! Configuration management for the widget.
//!
//! Feature flags (transport selection, timings) are resolved once at boot.
//! The sync engine receives an immutable copy and never re-reads them.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::{form_urlencoded, Url};

/// Default server base URL (can be overridden at compile time via LIVEFEED_BASE_URL env var).
pub const DEFAULT_BASE_URL: &str = match option_env!("LIVEFEED_BASE_URL") {
    Some(url) => url,
    None => "http://127.0.0.1:8000",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;
const DEFAULT_MAX_SESSION_LIFETIME_MS: u64 = 15_000;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_MAX_TEXT_LEN: usize = 500;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Placeholder substituted with the message id in the delete endpoint.
const DELETE_ID_PLACEHOLDER: &str = "{id}";

/// Which transport strategy the widget uses to follow the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Long-lived server-sent event stream.
    Push,
    /// Periodic fetch of the full message list.
    #[default]
    Pull,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Push => "push",
            TransportKind::Pull => "pull",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" | "sse" | "stream" => Ok(TransportKind::Push),
            "pull" | "poll" | "polling" => Ok(TransportKind::Pull),
            other => Err(CoreError::Config(format!("Unknown transport: {}", other))),
        }
    }
}

/// Server endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Message listing endpoint (pull).
    pub messages: String,
    /// Event stream endpoint (push).
    pub stream: String,
    /// Send endpoint.
    pub send: String,
    /// Delete endpoint template; `{id}` is replaced with the message id.
    pub delete: String,
    /// Image upload endpoint.
    pub upload: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            messages: "/api/comments".to_string(),
            stream: "/api/comments/stream".to_string(),
            send: "/api/comments".to_string(),
            delete: "/api/comments/{id}".to_string(),
            upload: "/api/upload".to_string(),
        }
    }
}

impl EndpointConfig {
    /// Expand the delete template for one message id.
    ///
    /// The id is percent-encoded as one path segment so it can never climb
    /// out of the template when joined to the base URL. Dot segments survive
    /// encoding, so `.` and `..` are refused outright.
    pub fn delete_path(&self, message_id: &str) -> CoreResult<String> {
        if matches!(message_id, "" | "." | "..") {
            return Err(CoreError::Config(format!(
                "Invalid message id: {:?}",
                message_id
            )));
        }

        let segment = form_urlencoded::byte_serialize(message_id.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        Ok(self.delete.replace(DELETE_ID_PLACEHOLDER, &segment))
    }
}

/// Client-side upload checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadLimits {
    /// Largest accepted file, in bytes.
    pub max_bytes: u64,
    /// Accepted MIME types.
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_mime_types: ["image/jpeg", "image/png", "image/gif", "image/webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl UploadLimits {
    pub fn allows_mime(&self, mime: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime))
    }
}

/// Main widget configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Server base URL.
    pub base_url: String,
    /// Transport strategy, fixed for the lifetime of the engine.
    pub transport: TransportKind,
    /// Pull: interval between fetches.
    pub poll_interval_ms: u64,
    /// Push: maximum age of one stream session.
    pub max_session_lifetime_ms: u64,
    /// Push: delay before reconnecting after an error or forced expiry.
    pub reconnect_delay_ms: u64,
    /// Push: whether sessions are force-cycled at `max_session_lifetime_ms`.
    pub lifetime_reconnect_enabled: bool,
    /// Deadline for one non-streaming request. Never longer than the poll interval.
    pub request_timeout_ms: u64,
    /// Maximum message length in characters.
    pub max_text_len: usize,
    /// Server endpoint paths.
    pub endpoints: EndpointConfig,
    /// Upload checks.
    pub upload: UploadLimits,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            transport: TransportKind::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_session_lifetime_ms: DEFAULT_MAX_SESSION_LIFETIME_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            lifetime_reconnect_enabled: false,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            endpoints: EndpointConfig::default(),
            upload: UploadLimits::default(),
        }
    }
}

impl FeedConfig {
    /// Load configuration from the config file (if any), then the environment.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FeedConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) -> CoreResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `LIVEFEED_*` overrides from the given lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LIVEFEED_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = lookup("LIVEFEED_BASE_URL") {
            self.base_url = url;
        }
        if let Some(transport) = lookup("LIVEFEED_TRANSPORT") {
            self.transport = transport.parse()?;
        }
        if let Some(interval) = lookup("LIVEFEED_POLL_INTERVAL_MS") {
            self.poll_interval_ms = interval.parse().map_err(|_| {
                CoreError::Config(format!("Invalid LIVEFEED_POLL_INTERVAL_MS: {}", interval))
            })?;
        }
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        self.base_url()?;

        if self.poll_interval_ms == 0 {
            return Err(CoreError::Config("poll_interval_ms must be positive".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(CoreError::Config("request_timeout_ms must be positive".into()));
        }
        if self.max_session_lifetime_ms == 0 {
            return Err(CoreError::Config(
                "max_session_lifetime_ms must be positive".into(),
            ));
        }
        if !self.endpoints.delete.contains(DELETE_ID_PLACEHOLDER) {
            return Err(CoreError::Config(format!(
                "delete endpoint must contain {}",
                DELETE_ID_PLACEHOLDER
            )));
        }
        Ok(())
    }

    /// Get the base URL as a parsed URL.
    pub fn base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.base_url).map_err(CoreError::from)
    }

    /// Resolve an endpoint path against the base URL.
    pub fn endpoint_url(&self, path: &str) -> CoreResult<Url> {
        Ok(self.base_url()?.join(path)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_session_lifetime(&self) -> Duration {
        Duration::from_millis(self.max_session_lifetime_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Request deadline, capped at the poll interval so a stalled fetch
    /// cannot outlive the next tick.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.min(self.poll_interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = FeedConfig::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.transport, TransportKind::Pull);
        assert_eq!(config.poll_interval(), Duration::from_millis(15_000));
        assert_eq!(config.max_session_lifetime(), Duration::from_millis(15_000));
        assert_eq!(config.reconnect_delay(), Duration::from_millis(1_000));
        assert!(!config.lifetime_reconnect_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_request_timeout_capped_by_poll_interval() {
        let config = FeedConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_millis(10_000));

        let config = FeedConfig {
            poll_interval_ms: 2_000,
            ..FeedConfig::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_millis(2_000));

        let config = FeedConfig {
            request_timeout_ms: 0,
            ..FeedConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!("push".parse::<TransportKind>().unwrap(), TransportKind::Push);
        assert_eq!("SSE".parse::<TransportKind>().unwrap(), TransportKind::Push);
        assert_eq!("poll".parse::<TransportKind>().unwrap(), TransportKind::Pull);
        assert!("carrier-pigeon".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_config_load_partial_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let config_json = r#"{
            "transport": "push",
            "lifetime_reconnect_enabled": true,
            "endpoints": { "stream": "/events" }
        }"#;
        std::fs::write(&config_path, config_json).unwrap();

        let config = FeedConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.transport, TransportKind::Push);
        assert!(config.lifetime_reconnect_enabled);
        assert_eq!(config.endpoints.stream, "/events");
        assert_eq!(config.endpoints.messages, "/api/comments");
        assert_eq!(config.poll_interval_ms, 15_000);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = FeedConfig {
            poll_interval_ms: 5_000,
            transport: TransportKind::Push,
            ..FeedConfig::default()
        };
        config.save(&paths).unwrap();

        let loaded = FeedConfig::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("LIVEFEED_TRANSPORT", "push"),
            ("LIVEFEED_POLL_INTERVAL_MS", "2500"),
            ("LIVEFEED_BASE_URL", "https://feed.example.com"),
        ]
        .into_iter()
        .collect();

        let mut config = FeedConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.transport, TransportKind::Push);
        assert_eq!(config.poll_interval_ms, 2_500);
        assert_eq!(config.base_url, "https://feed.example.com");
    }

    #[test]
    fn test_invalid_interval_override() {
        let mut config = FeedConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "LIVEFEED_POLL_INTERVAL_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = FeedConfig {
            base_url: "not a url".to_string(),
            ..FeedConfig::default()
        };
        assert!(config.validate().is_err());

        let config = FeedConfig {
            poll_interval_ms: 0,
            ..FeedConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = FeedConfig::default();
        config.endpoints.delete = "/api/comments".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_resolution() {
        let config = FeedConfig {
            base_url: "https://feed.example.com".to_string(),
            ..FeedConfig::default()
        };

        let url = config
            .endpoint_url(&config.endpoints.delete_path("42").unwrap())
            .unwrap();
        assert_eq!(url.as_str(), "https://feed.example.com/api/comments/42");
    }

    #[test]
    fn test_delete_path_encodes_id() {
        let endpoints = EndpointConfig::default();
        assert_eq!(endpoints.delete_path("42").unwrap(), "/api/comments/42");
        assert_eq!(endpoints.delete_path("a b?c").unwrap(), "/api/comments/a%20b%3Fc");
        assert!(endpoints.delete_path("..").is_err());
        assert!(endpoints.delete_path("").is_err());

        let config = FeedConfig {
            base_url: "https://feed.example.com".to_string(),
            ..FeedConfig::default()
        };
        let url = config
            .endpoint_url(&endpoints.delete_path("../x").unwrap())
            .unwrap();
        assert_eq!(url.as_str(), "https://feed.example.com/api/comments/..%2Fx");
    }

    #[test]
    fn test_upload_limits_mime() {
        let limits = UploadLimits::default();
        assert!(limits.allows_mime("image/png"));
        assert!(limits.allows_mime("IMAGE/JPEG"));
        assert!(!limits.allows_mime("application/pdf"));
    }
}
