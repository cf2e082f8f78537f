//! End-to-end loads through the driver with an in-memory engine channel.

use pdf_bridge::protocol::EncodedMessage;
use pdf_bridge::runtime::{BridgeDriver, BridgeHandle, MemoryChannel};
use pdf_bridge::transfer::{BlobRegistry, DocumentFile};
use pdf_bridge::{BridgeConfig, LoadEvent, LoadToken, Phase};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

fn config() -> BridgeConfig {
    BridgeConfig {
        transfer_threshold: 16,
        ..BridgeConfig::default()
    }
}

async fn next_of_type(posted: &mut UnboundedReceiver<EncodedMessage>, kind: &str) -> EncodedMessage {
    loop {
        let message = posted.recv().await.expect("channel open");
        if message.message_type() == Some(kind) {
            return message;
        }
    }
}

async fn wait_for_phase(handle: &BridgeHandle, phase: Phase) {
    let mut snapshot = handle.snapshot();
    snapshot
        .wait_for(|s| s.phase == phase)
        .await
        .expect("driver running");
}

async fn ready_bridge() -> (BridgeHandle, UnboundedReceiver<EncodedMessage>) {
    let (channel, posted) = MemoryChannel::new();
    let handle = BridgeDriver::spawn(config(), Arc::new(channel), None);
    handle.frame_loaded().unwrap();
    handle.deliver(json!({ "type": "pdf-editor-ready" })).unwrap();
    (handle, posted)
}

#[tokio::test(start_paused = true)]
async fn large_file_travels_by_reference_and_is_released() {
    let (channel, mut posted) = MemoryChannel::new();
    let registry = Arc::new(BlobRegistry::new());
    let handle = BridgeDriver::spawn_with_registry(config(), Arc::new(channel), None, registry.clone());
    handle.frame_loaded().unwrap();
    handle.deliver(json!({ "type": "pdf-editor-ready" })).unwrap();

    handle
        .open(DocumentFile::from_bytes("big.pdf", vec![0u8; 64]))
        .unwrap();
    let load = next_of_type(&mut posted, "load-pdf").await;

    assert!(load.transfer.is_none());
    let url = load.body["url"].as_str().unwrap();
    assert!(url.starts_with("blob:pdf-bridge/"));
    assert_eq!(registry.live_count(), 1);

    handle.shutdown().await.unwrap();
    assert_eq!(registry.live_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn replaced_file_ignores_late_replies() {
    let (handle, mut posted) = ready_bridge().await;

    handle.open(DocumentFile::from_bytes("a.pdf", vec![1u8])).unwrap();
    let first = next_of_type(&mut posted, "load-pdf").await.load_token().unwrap();
    handle.open(DocumentFile::from_bytes("b.pdf", vec![2u8])).unwrap();
    let second = next_of_type(&mut posted, "load-pdf").await.load_token().unwrap();
    assert!(second > first);

    handle
        .deliver(json!({ "type": "pdf-loaded", "loadToken": first.value() }))
        .unwrap();
    handle
        .deliver(json!({ "type": "pdf-error", "loadToken": first.value(), "message": "boom" }))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let snapshot = handle.current();
    assert_eq!(snapshot.phase, Phase::Transferring);
    assert_eq!(snapshot.error, None);

    handle
        .deliver(json!({ "type": "pdf-loaded", "loadToken": second.value(), "pageCount": 3 }))
        .unwrap();
    wait_for_phase(&handle, Phase::Loaded).await;
    let snapshot = handle.current();
    assert_eq!(snapshot.file_name.as_deref(), Some("b.pdf"));
    assert_eq!(snapshot.page_count, Some(3));
    assert_eq!(snapshot.progress, 100);
}

#[tokio::test(start_paused = true)]
async fn silent_engine_gets_the_fallback_transfer() {
    let (channel, mut posted) = MemoryChannel::new();
    let handle = BridgeDriver::spawn(config(), Arc::new(channel), None);
    handle.frame_loaded().unwrap();
    handle.open(DocumentFile::from_bytes("a.pdf", vec![1u8])).unwrap();

    let load = next_of_type(&mut posted, "load-pdf").await;
    assert_eq!(load.load_token(), Some(LoadToken::new(1)));
    assert!(handle.current().fallback_used);
}

#[tokio::test(start_paused = true)]
async fn host_cancel_is_acknowledged_without_error() {
    let (handle, mut posted) = ready_bridge().await;
    let mut events = handle.subscribe();

    handle.open(DocumentFile::from_bytes("a.pdf", vec![1u8])).unwrap();
    let token = next_of_type(&mut posted, "load-pdf").await.load_token().unwrap();
    handle.cancel().unwrap();

    let cancel = next_of_type(&mut posted, "cancel-load").await;
    assert_eq!(cancel.load_token(), Some(token));
    handle
        .deliver(json!({ "type": "pdf-load-cancelled", "loadToken": token.value() }))
        .unwrap();
    wait_for_phase(&handle, Phase::Cancelled).await;

    tokio::time::sleep(Duration::from_secs(120)).await;
    let snapshot = handle.current();
    assert!(snapshot.cancelled);
    assert!(!snapshot.busy);
    assert_eq!(snapshot.error, None);

    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, LoadEvent::Failed { .. }), "unexpected {event:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn engine_cancellation_surfaces_as_error() {
    let (handle, mut posted) = ready_bridge().await;
    handle.open(DocumentFile::from_bytes("a.pdf", vec![1u8])).unwrap();
    let token = next_of_type(&mut posted, "load-pdf").await.load_token().unwrap();

    handle
        .deliver(json!({ "type": "pdf-load-cancelled", "loadToken": token.value() }))
        .unwrap();
    wait_for_phase(&handle, Phase::Errored).await;
    assert!(handle.current().error.is_some());
}

#[tokio::test(start_paused = true)]
async fn engine_that_never_loads_times_out() {
    let (handle, mut posted) = ready_bridge().await;
    handle.open(DocumentFile::from_bytes("a.pdf", vec![1u8])).unwrap();
    let token = next_of_type(&mut posted, "load-pdf").await.load_token().unwrap();

    let cancel = next_of_type(&mut posted, "cancel-load").await;
    assert_eq!(cancel.load_token(), Some(token));
    let snapshot = handle.current();
    assert_eq!(snapshot.phase, Phase::Errored);
    assert_eq!(
        snapshot.error.as_deref(),
        Some(pdf_bridge::classify::LOAD_TIMEOUT_MESSAGE)
    );
}
