//! Deferred cache write-back
//!
//! After a document loads, its bytes are written to the document cache
//! following a short delay. Each write-back is paired with a one-shot
//! `WriteBackTicket` held by whoever scheduled it; cancelling or dropping
//! the ticket stops the write while it waits, and it is checked again before
//! the write. A write already handed to the cache runs to completion.

use super::file::DocumentFile;
use crate::cache::{CacheKey, CachedDocument, DocumentCache};
use crate::error::BridgeResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// One-shot cancel for a single pending write-back.
///
/// Cancelling consumes the ticket. Dropping it has the same effect, so a
/// write-back never outlives the scheduler that issued it.
#[derive(Debug)]
pub struct WriteBackTicket {
    cancel: watch::Sender<bool>,
}

/// The write-back side of a ticket.
#[derive(Debug, Clone)]
pub struct WriteBackSignal {
    cancelled: watch::Receiver<bool>,
}

impl WriteBackTicket {
    pub fn issue() -> (Self, WriteBackSignal) {
        let (cancel, cancelled) = watch::channel(false);
        (Self { cancel }, WriteBackSignal { cancelled })
    }

    pub fn cancel(self) {
        self.cancel.send_replace(true);
    }
}

impl WriteBackSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow() || self.cancelled.has_changed().is_err()
    }

    async fn cancelled(&mut self) {
        // Err means the ticket was dropped.
        let _ = self.cancelled.wait_for(|cancelled| *cancelled).await;
    }
}

/// How a write-back ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBackOutcome {
    Written,
    Cancelled,
    /// The file produced no bytes; nothing was stored.
    Empty,
}

/// Wait `delay`, then store `file` under `key` unless the ticket behind
/// `signal` was cancelled.
pub async fn write_back(
    cache: Arc<dyn DocumentCache>,
    key: CacheKey,
    file: DocumentFile,
    delay: Duration,
    mut signal: WriteBackSignal,
) -> BridgeResult<WriteBackOutcome> {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = signal.cancelled() => return Ok(WriteBackOutcome::Cancelled),
    }

    let bytes = file.source().read_all().await?;
    if bytes.is_empty() {
        return Ok(WriteBackOutcome::Empty);
    }
    if signal.is_cancelled() {
        return Ok(WriteBackOutcome::Cancelled);
    }

    let record = CachedDocument::new(file.name(), file.mime(), bytes);
    tokio::task::spawn_blocking(move || cache.save(key, &record)).await??;
    debug!(file = %file.name(), %key, "document cached");
    Ok(WriteBackOutcome::Written)
}
