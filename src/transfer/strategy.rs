//! Transfer strategy: inline bytes vs. reference handle
//!
//! Files at or below the threshold are read into memory and handed over
//! with ownership transfer. Larger files get one reference handle for as
//! long as they are current. The previous file's handle is released exactly
//! once, when the file changes or on teardown.

use super::file::DocumentFile;
use super::reference::{ReferenceHandle, ReferenceRegistry};
use crate::protocol::TransferPayload;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

/// Default inline-vs-reference threshold (32 MiB).
pub const DEFAULT_TRANSFER_THRESHOLD: u64 = 32 * 1024 * 1024;

/// Which form a file travels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    InlineBytes,
    Reference,
}

/// A byte read that may still be in flight. Shared so a transfer can reuse
/// a read that was started when the file was accepted.
type PendingRead = Arc<OnceCell<Option<Bytes>>>;

/// The decision and artifacts for the current file.
#[derive(Debug, Clone)]
pub struct TransferDescriptor {
    pub file_id: Uuid,
    pub strategy: StrategyKind,
    pub reference_handle: Option<ReferenceHandle>,
    pub has_pending_read: bool,
}

#[derive(Debug)]
struct Prepared {
    file_id: Uuid,
    strategy: StrategyKind,
    reference: Option<ReferenceHandle>,
    pending: Option<PendingRead>,
}

/// Chooses the transfer form per file and owns reference handles.
pub struct TransferStrategy {
    threshold: u64,
    registry: Arc<dyn ReferenceRegistry>,
    current: Option<Prepared>,
}

impl TransferStrategy {
    pub fn new(threshold: u64, registry: Arc<dyn ReferenceRegistry>) -> Self {
        Self {
            threshold,
            registry,
            current: None,
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn decide(&self, size: u64) -> StrategyKind {
        if size <= self.threshold {
            StrategyKind::InlineBytes
        } else {
            StrategyKind::Reference
        }
    }

    /// Make `file` the current file.
    ///
    /// Preparing the current file again is a no-op. Otherwise the previous
    /// file's handle is released and the new file's read is started or its
    /// handle created.
    pub fn prepare(&mut self, file: &DocumentFile) -> StrategyKind {
        if let Some(current) = &self.current {
            if current.file_id == file.id() {
                return current.strategy;
            }
        }
        self.release();

        let strategy = self.decide(file.size());
        let prepared = match strategy {
            StrategyKind::InlineBytes => Prepared {
                file_id: file.id(),
                strategy,
                reference: None,
                pending: Some(start_read(file)),
            },
            StrategyKind::Reference => {
                let handle = self.registry.create(file);
                debug!(file = %file.name(), handle = %handle, "created reference handle");
                Prepared {
                    file_id: file.id(),
                    strategy,
                    reference: Some(handle),
                    pending: None,
                }
            }
        };
        self.current = Some(prepared);
        strategy
    }

    /// Start handing `file` to the engine.
    ///
    /// An inline transfer consumes the pending read; a reference transfer
    /// reuses the live handle.
    pub fn begin(&mut self, file: &DocumentFile) -> PendingTransfer {
        self.prepare(file);
        let Some(current) = self.current.as_mut() else {
            return PendingTransfer::Ready(TransferPayload::File);
        };
        match current.strategy {
            StrategyKind::InlineBytes => PendingTransfer::Inline {
                file: file.clone(),
                read: current.pending.take().unwrap_or_else(|| start_read(file)),
            },
            StrategyKind::Reference => match &current.reference {
                Some(handle) => PendingTransfer::Ready(TransferPayload::Reference(handle.clone())),
                None => PendingTransfer::Ready(TransferPayload::File),
            },
        }
    }

    pub fn descriptor(&self) -> Option<TransferDescriptor> {
        self.current.as_ref().map(|c| TransferDescriptor {
            file_id: c.file_id,
            strategy: c.strategy,
            reference_handle: c.reference.clone(),
            has_pending_read: c.pending.is_some(),
        })
    }

    /// Drop the current file, releasing its handle if it has one.
    pub fn release(&mut self) {
        if let Some(previous) = self.current.take() {
            if let Some(handle) = previous.reference {
                if self.registry.release(&handle) {
                    debug!(handle = %handle, "released reference handle");
                }
            }
        }
    }
}

impl Drop for TransferStrategy {
    fn drop(&mut self) {
        self.release();
    }
}

fn start_read(file: &DocumentFile) -> PendingRead {
    let read: PendingRead = Arc::new(OnceCell::new());
    if let Ok(runtime) = tokio::runtime::Handle::try_current() {
        let prefetch = read.clone();
        let source = file.source().clone();
        runtime.spawn(async move {
            prefetch
                .get_or_init(|| async move { source.read_all().await.ok() })
                .await;
        });
    }
    read
}

/// A transfer whose payload may still need materializing.
#[derive(Debug)]
pub enum PendingTransfer {
    Ready(TransferPayload),
    Inline { file: DocumentFile, read: PendingRead },
}

impl PendingTransfer {
    /// Produce the payload to post.
    ///
    /// Inline: the shared read, then one fresh read if that failed or was
    /// empty, then the raw file handle.
    pub async fn resolve(self) -> TransferPayload {
        match self {
            Self::Ready(payload) => payload,
            Self::Inline { file, read } => {
                let source = file.source().clone();
                let first = read
                    .get_or_init(|| async move { source.read_all().await.ok() })
                    .await
                    .clone();
                if let Some(bytes) = first.filter(|b| !b.is_empty()) {
                    return TransferPayload::Bytes(bytes);
                }
                match file.source().read_all().await {
                    Ok(bytes) if !bytes.is_empty() => TransferPayload::Bytes(bytes),
                    _ => {
                        debug!(file = %file.name(), "no bytes materialized, sending file handle");
                        TransferPayload::File
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::file::ByteSource;
    use crate::transfer::reference::BlobRegistry;
    use async_trait::async_trait;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct CountingRegistry {
        inner: BlobRegistry,
        released: Mutex<Vec<ReferenceHandle>>,
    }

    impl ReferenceRegistry for CountingRegistry {
        fn create(&self, file: &DocumentFile) -> ReferenceHandle {
            self.inner.create(file)
        }

        fn release(&self, handle: &ReferenceHandle) -> bool {
            self.released.lock().unwrap().push(handle.clone());
            self.inner.release(handle)
        }
    }

    #[derive(Debug)]
    struct ScriptedSource {
        reads: AtomicUsize,
        results: Mutex<Vec<io::Result<Bytes>>>,
    }

    impl ScriptedSource {
        fn new(results: Vec<io::Result<Bytes>>) -> Self {
            Self {
                reads: AtomicUsize::new(0),
                results: Mutex::new(results),
            }
        }
    }

    #[async_trait]
    impl ByteSource for ScriptedSource {
        async fn read_all(&self) -> io::Result<Bytes> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                Ok(Bytes::new())
            } else {
                results.remove(0)
            }
        }
    }

    fn strategy(threshold: u64) -> (TransferStrategy, Arc<CountingRegistry>) {
        let registry = Arc::new(CountingRegistry::default());
        (TransferStrategy::new(threshold, registry.clone()), registry)
    }

    #[test]
    fn threshold_is_inclusive_for_inline() {
        let (strategy, _) = strategy(10);
        assert_eq!(strategy.decide(10), StrategyKind::InlineBytes);
        assert_eq!(strategy.decide(11), StrategyKind::Reference);
    }

    #[tokio::test]
    async fn small_file_travels_inline() {
        let (mut strategy, registry) = strategy(1024);
        let file = DocumentFile::from_bytes("a.pdf", vec![1u8, 2, 3]);

        assert_eq!(strategy.prepare(&file), StrategyKind::InlineBytes);
        let payload = strategy.begin(&file).resolve().await;
        assert_eq!(payload, TransferPayload::Bytes(Bytes::from_static(&[1, 2, 3])));
        assert_eq!(registry.inner.live_count(), 0);
    }

    #[tokio::test]
    async fn inline_transfer_reuses_in_flight_read() {
        let (mut strategy, _) = strategy(1024);
        let source = Arc::new(ScriptedSource::new(vec![Ok(Bytes::from_static(b"pdf"))]));
        let file = DocumentFile::new("a.pdf", 3, source.clone());

        strategy.prepare(&file);
        strategy.prepare(&file);
        let payload = strategy.begin(&file).resolve().await;

        assert_eq!(payload, TransferPayload::Bytes(Bytes::from_static(b"pdf")));
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
        assert!(!strategy.descriptor().unwrap().has_pending_read);
    }

    #[tokio::test]
    async fn failed_read_retries_once_then_succeeds() {
        let (mut strategy, _) = strategy(1024);
        let source = Arc::new(ScriptedSource::new(vec![
            Err(io::Error::new(io::ErrorKind::Other, "boom")),
            Ok(Bytes::from_static(b"ok")),
        ]));
        let file = DocumentFile::new("a.pdf", 2, source.clone());

        let payload = strategy.begin(&file).resolve().await;
        assert_eq!(payload, TransferPayload::Bytes(Bytes::from_static(b"ok")));
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_reads_fall_back_to_file_handle() {
        let (mut strategy, _) = strategy(1024);
        let source = Arc::new(ScriptedSource::new(vec![Ok(Bytes::new()), Ok(Bytes::new())]));
        let file = DocumentFile::new("a.pdf", 2, source);

        assert_eq!(strategy.begin(&file).resolve().await, TransferPayload::File);
    }

    #[tokio::test]
    async fn large_file_reuses_one_handle() {
        let (mut strategy, registry) = strategy(2);
        let file = DocumentFile::from_bytes("big.pdf", vec![0u8; 8]);

        assert_eq!(strategy.prepare(&file), StrategyKind::Reference);
        let first = strategy.begin(&file).resolve().await;
        let second = strategy.begin(&file).resolve().await;

        assert_eq!(first, second);
        assert!(matches!(first, TransferPayload::Reference(_)));
        assert_eq!(registry.inner.live_count(), 1);
        assert!(registry.released.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn replacing_file_releases_previous_handle_once() {
        let (mut strategy, registry) = strategy(2);
        let a = DocumentFile::from_bytes("a.pdf", vec![0u8; 8]);
        let b = DocumentFile::from_bytes("b.pdf", vec![0u8; 8]);

        strategy.prepare(&a);
        let handle_a = strategy.descriptor().unwrap().reference_handle.unwrap();
        strategy.prepare(&b);
        let handle_b = strategy.descriptor().unwrap().reference_handle.unwrap();

        assert_eq!(registry.inner.live_count(), 1);
        assert_eq!(*registry.released.lock().unwrap(), vec![handle_a]);

        strategy.release();
        strategy.release();
        drop(strategy);
        assert_eq!(registry.released.lock().unwrap().len(), 2);
        assert_eq!(registry.released.lock().unwrap()[1], handle_b);
        assert_eq!(registry.inner.live_count(), 0);
    }

    #[tokio::test]
    async fn switching_to_inline_releases_handle() {
        let (mut strategy, registry) = strategy(4);
        strategy.prepare(&DocumentFile::from_bytes("big.pdf", vec![0u8; 8]));
        strategy.prepare(&DocumentFile::from_bytes("small.pdf", vec![0u8; 2]));
        assert_eq!(registry.inner.live_count(), 0);
        assert_eq!(strategy.descriptor().unwrap().strategy, StrategyKind::InlineBytes);
    }
}
