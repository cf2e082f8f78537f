//! Document cache backends
//!
//! A small key/value store holding the last loaded input document and the
//! last downloaded output. `SqliteDocumentCache` persists across runs;
//! `MemoryDocumentCache` does not.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryDocumentCache;
pub use sqlite::SqliteDocumentCache;
pub use traits::{CacheError, CacheKey, CacheResult, CachedDocument, DocumentCache, OpenCache};
