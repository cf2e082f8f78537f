//! Moving document bytes to the engine
//!
//! A file travels either inline (its bytes moved into the message) or as a
//! reference handle the engine resolves itself. After a successful load its
//! bytes are written back to the document cache.

mod file;
mod reference;
mod strategy;
mod writeback;

pub use file::{ByteSource, DiskSource, DocumentFile, FileDescriptor, MemorySource};
pub use reference::{BlobRegistry, FileUrlRegistry, ReferenceHandle, ReferenceRegistry};
pub use strategy::{
    PendingTransfer, StrategyKind, TransferDescriptor, TransferStrategy,
    DEFAULT_TRANSFER_THRESHOLD,
};
pub use writeback::{write_back, WriteBackOutcome, WriteBackSignal, WriteBackTicket};
