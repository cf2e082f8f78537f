//! Document cache trait definitions

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// The two slots the cache keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The last document successfully loaded into the engine
    Input,
    /// The last document the engine handed back for download
    Output,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached document record
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDocument {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
    pub updated_at: DateTime<Utc>,
}

impl CachedDocument {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
            updated_at: Utc::now(),
        }
    }
}

/// Trait for document cache backends
///
/// Implementations must be thread-safe (Send + Sync); the driver calls them
/// from blocking worker threads.
pub trait DocumentCache: Send + Sync {
    /// Insert or replace the record under `key`
    fn save(&self, key: CacheKey, document: &CachedDocument) -> CacheResult<()>;

    /// Load the record under `key`
    fn load(&self, key: CacheKey) -> CacheResult<Option<CachedDocument>>;

    /// Remove the record under `key`, returning whether one existed
    fn remove(&self, key: CacheKey) -> CacheResult<bool>;
}

/// Trait for opening cache backends
pub trait OpenCache: DocumentCache + Sized {
    /// Open or create a cache at the given path
    fn open(path: impl AsRef<Path>) -> CacheResult<Self>;

    /// Create an in-memory cache (useful for testing)
    fn open_in_memory() -> CacheResult<Self>;
}
