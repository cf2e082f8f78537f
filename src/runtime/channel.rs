//! Engine channel abstraction
//!
//! The bridge only ever posts messages; it never waits for a reply. Replies
//! arrive separately and are fed into the driver with `BridgeHandle::deliver`.

use crate::error::{BridgeError, BridgeResult};
use crate::protocol::EncodedMessage;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Transport to the embedded engine.
///
/// Abstracts over how the engine is reached (child process, in-memory
/// channel for tests) so the driver doesn't depend on it.
#[async_trait]
pub trait EngineChannel: Send + Sync {
    /// Post one message. Delivery is fire-and-forget.
    async fn post(&self, message: EncodedMessage) -> BridgeResult<()>;
}

/// In-memory channel. Posted messages come out of the paired receiver.
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<EncodedMessage>,
}

impl MemoryChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EncodedMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EngineChannel for MemoryChannel {
    async fn post(&self, message: EncodedMessage) -> BridgeResult<()> {
        self.tx.send(message).map_err(|_| BridgeError::ChannelClosed)
    }
}

/// Channel that records everything posted to it.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    posted: Arc<Mutex<Vec<EncodedMessage>>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire types of the messages posted so far, in order.
    pub fn message_types(&self) -> Vec<String> {
        self.messages()
            .iter()
            .filter_map(|m| m.message_type().map(str::to_string))
            .collect()
    }

    pub fn messages(&self) -> Vec<EncodedMessage> {
        self.posted
            .lock()
            .map(|posted| posted.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EngineChannel for RecordingChannel {
    async fn post(&self, message: EncodedMessage) -> BridgeResult<()> {
        if let Ok(mut posted) = self.posted.lock() {
            posted.push(message);
        }
        Ok(())
    }
}
