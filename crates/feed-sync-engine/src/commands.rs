//! User-issued commands: send, delete and image upload.
//!
//! Commands do not touch the message store. After a successful send or
//! delete the engine is asked to refresh, and the next snapshot carries the
//! change.

use crate::engine::SyncEngine;
use crate::error::{CommandError, CommandResult};
use async_trait::async_trait;
use feed_config_and_utils::{FeedConfig, UploadLimits};
use feed_http_client::FeedClient;
use feed_protocol_types::{MessageId, SendMessageRequest};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// What the local user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Can delete any message.
    Admin,
    Member,
}

/// The remote end of the command channel.
#[async_trait]
pub trait CommandBackend: Send + Sync {
    async fn send_message(&self, request: &SendMessageRequest) -> CommandResult<()>;
    async fn delete_message(&self, id: &MessageId) -> CommandResult<()>;
    /// Returns the URL of the stored image.
    async fn upload_image(
        &self,
        file_name: String,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> CommandResult<String>;
}

#[async_trait]
impl CommandBackend for FeedClient {
    async fn send_message(&self, request: &SendMessageRequest) -> CommandResult<()> {
        Ok(FeedClient::send_message(self, request).await?)
    }

    async fn delete_message(&self, id: &MessageId) -> CommandResult<()> {
        Ok(FeedClient::delete_message(self, id).await?)
    }

    async fn upload_image(
        &self,
        file_name: String,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> CommandResult<String> {
        Ok(FeedClient::upload_image(self, file_name, mime_type, bytes).await?)
    }
}

/// Local validation limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLimits {
    /// Maximum message length in characters, after trimming.
    pub max_text_len: usize,
    pub upload: UploadLimits,
}

impl CommandLimits {
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            max_text_len: config.max_text_len,
            upload: config.upload.clone(),
        }
    }
}

impl Default for CommandLimits {
    fn default() -> Self {
        Self::from_config(&FeedConfig::default())
    }
}

pub struct CommandChannel {
    backend: Arc<dyn CommandBackend>,
    engine: SyncEngine,
    capability: Capability,
    limits: CommandLimits,
}

impl CommandChannel {
    pub fn new(
        backend: Arc<dyn CommandBackend>,
        engine: SyncEngine,
        capability: Capability,
        limits: CommandLimits,
    ) -> Self {
        Self {
            backend,
            engine,
            capability,
            limits,
        }
    }

    /// Post a message. Text is trimmed; an empty text needs an image.
    pub async fn send(&self, text: &str, image_url: Option<String>) -> CommandResult<()> {
        let request = self.validate_send(text, image_url)?;

        if let Err(e) = self.backend.send_message(&request).await {
            error!(error = %e, "Failed to send message");
            return Err(e);
        }

        info!(
            text_len = request.text.chars().count(),
            has_image = request.image_url.is_some(),
            "Message sent"
        );
        self.engine.refresh();
        Ok(())
    }

    /// Delete a message. Admin only; members are refused locally.
    pub async fn delete(&self, id: &MessageId) -> CommandResult<()> {
        if self.capability != Capability::Admin {
            return Err(CommandError::Forbidden);
        }

        if let Err(e) = self.backend.delete_message(id).await {
            error!(message_id = %id, error = %e, "Failed to delete message");
            return Err(e);
        }

        info!(message_id = %id, "Message deleted");
        self.engine.message_deleted(id);
        Ok(())
    }

    /// Upload an image file and return its URL.
    ///
    /// Type and size are checked before the file is read, so an oversized
    /// file never leaves the machine.
    pub async fn upload_image(&self, path: &Path) -> CommandResult<String> {
        let mime_type = mime_for_path(path).ok_or_else(|| {
            CommandError::Validation(format!("Unsupported file type: {}", path.display()))
        })?;
        if !self.limits.upload.allows_mime(mime_type) {
            return Err(CommandError::Validation(format!(
                "File type {} is not allowed",
                mime_type
            )));
        }

        let size = tokio::fs::metadata(path).await?.len();
        self.check_size(size)?;

        let bytes = tokio::fs::read(path).await?;
        self.check_size(bytes.len() as u64)?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        match self
            .backend
            .upload_image(file_name.clone(), mime_type, bytes)
            .await
        {
            Ok(url) => {
                info!(file_name = %file_name, size, url = %url, "Image uploaded");
                Ok(url)
            }
            Err(e) => {
                error!(file_name = %file_name, error = %e, "Failed to upload image");
                Err(e)
            }
        }
    }

    fn validate_send(
        &self,
        text: &str,
        image_url: Option<String>,
    ) -> CommandResult<SendMessageRequest> {
        let text = text.trim();
        let image_url = image_url.filter(|url| !url.trim().is_empty());

        if text.is_empty() && image_url.is_none() {
            return Err(CommandError::Validation(
                "Message needs text or an image".to_string(),
            ));
        }
        let len = text.chars().count();
        if len > self.limits.max_text_len {
            return Err(CommandError::Validation(format!(
                "Message is too long ({} characters, max {})",
                len, self.limits.max_text_len
            )));
        }

        Ok(SendMessageRequest {
            text: text.to_string(),
            image_url,
        })
    }

    fn check_size(&self, size: u64) -> CommandResult<()> {
        let max = self.limits.upload.max_bytes;
        if size > max {
            return Err(CommandError::Validation(format!(
                "File is too large ({} bytes, max {})",
                size, max
            )));
        }
        Ok(())
    }
}

/// MIME type for an image file, from its extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(&PathBuf::from("cat.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(&PathBuf::from("a/b/c.webp")), Some("image/webp"));
        assert_eq!(mime_for_path(&PathBuf::from("notes.txt")), None);
        assert_eq!(mime_for_path(&PathBuf::from("README")), None);
    }

    #[test]
    fn test_svg_is_known_but_not_allowed_by_default() {
        let limits = CommandLimits::default();
        let mime = mime_for_path(&PathBuf::from("logo.svg")).unwrap();
        assert!(!limits.upload.allows_mime(mime));
    }
}
