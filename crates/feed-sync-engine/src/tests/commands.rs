//! Command channel: local validation, capability checks, refresh after
//! success.

use super::harness::{capturing_engine, CapturingTransport, MockCommands, RecordingRenderer};
use crate::commands::{Capability, CommandChannel, CommandLimits};
use crate::error::CommandError;
use feed_config_and_utils::TransportKind;
use feed_protocol_types::MessageId;
use std::sync::Arc;
use tempfile::TempDir;

struct CommandFixture {
    backend: Arc<MockCommands>,
    transport: Arc<CapturingTransport>,
    renderer: Arc<RecordingRenderer>,
    channel: CommandChannel,
}

fn fixture(capability: Capability) -> CommandFixture {
    let (engine, transport, renderer) = capturing_engine(TransportKind::Pull);
    engine.open();

    let backend = Arc::new(MockCommands::new());
    let channel = CommandChannel::new(
        backend.clone(),
        engine,
        capability,
        CommandLimits::default(),
    );
    CommandFixture {
        backend,
        transport,
        renderer,
        channel,
    }
}

#[tokio::test]
async fn send_trims_text_and_refreshes() {
    let f = fixture(Capability::Member);

    f.channel.send("  hello there \n", None).await.unwrap();

    let sent = f.backend.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "hello there");
    assert!(sent[0].image_url.is_none());
    assert_eq!(f.transport.refreshes(), 1);
}

#[tokio::test]
async fn send_rejects_empty_text_without_image() {
    let f = fixture(Capability::Member);

    let result = f.channel.send("   ", None).await;
    assert!(matches!(result, Err(CommandError::Validation(_))));

    let result = f.channel.send("", Some("  ".to_string())).await;
    assert!(matches!(result, Err(CommandError::Validation(_))));

    assert!(f.backend.sent().is_empty());
    assert_eq!(f.transport.refreshes(), 0);
}

#[tokio::test]
async fn send_accepts_image_without_text() {
    let f = fixture(Capability::Member);

    f.channel
        .send("", Some("/uploads/cat.png".to_string()))
        .await
        .unwrap();

    let sent = f.backend.sent();
    assert_eq!(sent[0].text, "");
    assert_eq!(sent[0].image_url.as_deref(), Some("/uploads/cat.png"));
}

#[tokio::test]
async fn send_enforces_length_limit_in_characters() {
    let f = fixture(Capability::Member);

    let at_limit = "é".repeat(500);
    f.channel.send(&at_limit, None).await.unwrap();

    let too_long = "a".repeat(501);
    let result = f.channel.send(&too_long, None).await;
    assert!(matches!(result, Err(CommandError::Validation(_))));
    assert_eq!(f.backend.sent().len(), 1);
}

#[tokio::test]
async fn server_rejection_is_returned_without_refresh() {
    let f = fixture(Capability::Member);
    f.backend.reject_with("Slow down");

    let result = f.channel.send("hi", None).await;
    match result {
        Err(CommandError::Rejected(reason)) => assert_eq!(reason, "Slow down"),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(f.transport.refreshes(), 0);
}

#[tokio::test]
async fn member_cannot_delete() {
    let f = fixture(Capability::Member);

    let result = f.channel.delete(&MessageId::from(7)).await;
    assert!(matches!(result, Err(CommandError::Forbidden)));
    assert!(f.backend.deleted().is_empty());
    assert!(f.renderer.removed().is_empty());
}

#[tokio::test]
async fn admin_delete_removes_and_refreshes() {
    let f = fixture(Capability::Admin);

    f.channel.delete(&MessageId::from(7)).await.unwrap();

    assert_eq!(f.backend.deleted(), vec![MessageId::from(7)]);
    assert_eq!(f.renderer.removed(), vec!["7".to_string()]);
    assert_eq!(f.transport.refreshes(), 1);
}

#[tokio::test]
async fn failed_delete_leaves_message_on_screen() {
    let f = fixture(Capability::Admin);
    f.backend.reject_with("Not found");

    let result = f.channel.delete(&MessageId::from(7)).await;
    assert!(matches!(result, Err(CommandError::Rejected(_))));
    assert!(f.renderer.removed().is_empty());
}

#[tokio::test]
async fn oversized_upload_is_rejected_before_network() {
    let f = fixture(Capability::Member);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("huge.png");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(10 * 1024 * 1024).unwrap();

    let result = f.channel.upload_image(&path).await;
    match result {
        Err(CommandError::Validation(message)) => assert!(message.contains("too large")),
        other => panic!("unexpected: {:?}", other),
    }
    assert!(f.backend.uploads().is_empty());
}

#[tokio::test]
async fn unsupported_file_type_is_rejected() {
    let f = fixture(Capability::Member);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"hello").unwrap();

    let result = f.channel.upload_image(&path).await;
    assert!(matches!(result, Err(CommandError::Validation(_))));
    assert!(f.backend.uploads().is_empty());
}

#[tokio::test]
async fn upload_returns_url() {
    let f = fixture(Capability::Member);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cat.PNG");
    std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

    let url = f.channel.upload_image(&path).await.unwrap();

    assert_eq!(url, "/uploads/cat.PNG");
    let uploads = f.backend.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].mime_type, "image/png");
    assert_eq!(uploads[0].size, 4);
    // Uploading alone does not post anything.
    assert!(f.backend.sent().is_empty());
}

#[tokio::test]
async fn missing_file_is_io_error() {
    let f = fixture(Capability::Member);
    let dir = TempDir::new().unwrap();

    let result = f.channel.upload_image(&dir.path().join("gone.jpg")).await;
    assert!(matches!(result, Err(CommandError::Io(_))));
}
