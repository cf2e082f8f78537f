//! Reference handles: revocable locators for a file's bytes
//!
//! Large files are handed to the engine by reference instead of by copy.
//! Each handle must be released exactly once.

use super::file::DocumentFile;
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// An opaque, revocable locator for a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReferenceHandle(String);

impl ReferenceHandle {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creates and revokes reference handles.
pub trait ReferenceRegistry: Send + Sync {
    fn create(&self, file: &DocumentFile) -> ReferenceHandle;

    /// Revoke a handle. Returns false if the handle was not live.
    fn release(&self, handle: &ReferenceHandle) -> bool;
}

/// In-process registry minting `blob:` style locators.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    live: DashMap<ReferenceHandle, DocumentFile>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the file behind a live handle.
    pub fn resolve(&self, handle: &ReferenceHandle) -> Option<DocumentFile> {
        self.live.get(handle).map(|entry| entry.value().clone())
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl ReferenceRegistry for BlobRegistry {
    fn create(&self, file: &DocumentFile) -> ReferenceHandle {
        let handle = ReferenceHandle::new(format!("blob:pdf-bridge/{}", Uuid::new_v4()));
        self.live.insert(handle.clone(), file.clone());
        handle
    }

    fn release(&self, handle: &ReferenceHandle) -> bool {
        self.live.remove(handle).is_some()
    }
}

/// Registry for engines running out of process.
///
/// Files backed by a path on disk are handed over as `file://` locators;
/// anything else falls back to an in-process blob handle.
#[derive(Debug, Default)]
pub struct FileUrlRegistry {
    live: DashMap<ReferenceHandle, Uuid>,
    blobs: BlobRegistry,
}

impl FileUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len() + self.blobs.live_count()
    }
}

impl ReferenceRegistry for FileUrlRegistry {
    fn create(&self, file: &DocumentFile) -> ReferenceHandle {
        let Some(path) = file.source().path() else {
            return self.blobs.create(file);
        };
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let handle = ReferenceHandle::new(format!("file://{}", path.display()));
        self.live.insert(handle.clone(), file.id());
        handle
    }

    fn release(&self, handle: &ReferenceHandle) -> bool {
        self.live.remove(handle).is_some() || self.blobs.release(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::DiskSource;
    use std::sync::Arc;

    #[test]
    fn create_and_release_round_trip() {
        let registry = BlobRegistry::new();
        let file = DocumentFile::from_bytes("big.pdf", vec![0u8; 8]);

        let handle = registry.create(&file);
        assert!(handle.as_str().starts_with("blob:pdf-bridge/"));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.resolve(&handle).map(|f| f.id()), Some(file.id()));

        assert!(registry.release(&handle));
        assert!(!registry.release(&handle));
        assert_eq!(registry.live_count(), 0);
        assert!(registry.resolve(&handle).is_none());
    }

    #[test]
    fn handles_are_unique_per_create() {
        let registry = BlobRegistry::new();
        let file = DocumentFile::from_bytes("big.pdf", vec![0u8; 8]);
        assert_ne!(registry.create(&file), registry.create(&file));
    }

    #[test]
    fn disk_files_get_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        let file = DocumentFile::new("big.pdf", 8, Arc::new(DiskSource::new(&path)));

        let registry = FileUrlRegistry::new();
        let handle = registry.create(&file);
        assert!(handle.as_str().starts_with("file://"));
        assert!(handle.as_str().ends_with("big.pdf"));
        assert_eq!(registry.live_count(), 1);
        assert!(registry.release(&handle));
        assert!(!registry.release(&handle));
    }

    #[test]
    fn memory_files_fall_back_to_blobs() {
        let registry = FileUrlRegistry::new();
        let handle = registry.create(&DocumentFile::from_bytes("a.pdf", vec![1u8]));
        assert!(handle.as_str().starts_with("blob:pdf-bridge/"));
        assert!(registry.release(&handle));
        assert_eq!(registry.live_count(), 0);
    }
}
