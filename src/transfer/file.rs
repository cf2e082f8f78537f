//! Document files and their byte sources

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Where a document's bytes come from.
///
/// Reads may be slow and may fail; callers treat a failed or empty read as
/// "no bytes" and fall back to another transfer form.
#[async_trait]
pub trait ByteSource: Send + Sync + fmt::Debug {
    async fn read_all(&self) -> io::Result<Bytes>;

    /// On-disk location, if the bytes live in a file.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Bytes already held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource(Bytes);

impl MemorySource {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn read_all(&self) -> io::Result<Bytes> {
        Ok(self.0.clone())
    }
}

/// A file on disk, read lazily.
#[derive(Debug, Clone)]
pub struct DiskSource {
    path: PathBuf,
}

impl DiskSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ByteSource for DiskSource {
    async fn read_all(&self) -> io::Result<Bytes> {
        tokio::fs::read(&self.path).await.map(Bytes::from)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// A user-selected document.
///
/// Clones share the same `id`, which is how the transfer strategy tells a
/// re-submitted file from a new one.
#[derive(Clone)]
pub struct DocumentFile {
    id: Uuid,
    name: String,
    size: u64,
    mime: String,
    source: Arc<dyn ByteSource>,
}

impl DocumentFile {
    pub fn new(name: impl Into<String>, size: u64, source: Arc<dyn ByteSource>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            size,
            mime: "application/pdf".to_string(),
            source,
        }
    }

    /// A document whose bytes are already in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self::new(name, size, Arc::new(MemorySource::new(bytes)))
    }

    /// A document backed by a file on disk. Only metadata is read here.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a file: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self::new(name, metadata.len(), Arc::new(DiskSource::new(path))))
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.source
    }

    /// The raw file handle as it travels on the wire.
    pub fn descriptor(&self) -> FileDescriptor {
        FileDescriptor {
            name: self.name.clone(),
            size: self.size,
            mime: self.mime.clone(),
            path: self
                .source
                .path()
                .map(|p| p.to_string_lossy().to_string()),
        }
    }
}

impl fmt::Debug for DocumentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mime", &self.mime)
            .finish()
    }
}

/// Serializable description of a file handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity() {
        let file = DocumentFile::from_bytes("a.pdf", vec![1u8, 2, 3]);
        let clone = file.clone();
        assert_eq!(file.id(), clone.id());
        assert_ne!(file.id(), DocumentFile::from_bytes("a.pdf", vec![1u8]).id());
        assert_eq!(file.size(), 3);
    }

    #[tokio::test]
    async fn open_reads_metadata_and_bytes_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let file = DocumentFile::open(&path).await.unwrap();
        assert_eq!(file.name(), "doc.pdf");
        assert_eq!(file.size(), 8);
        assert_eq!(file.descriptor().path.as_deref(), Some(path.to_string_lossy().as_ref()));

        let bytes = file.source().read_all().await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.7");
    }

    #[tokio::test]
    async fn open_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        let err = DocumentFile::open(dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn descriptor_serializes_mime_as_type() {
        let file = DocumentFile::from_bytes("a.pdf", vec![0u8; 4]);
        let value = serde_json::to_value(file.descriptor()).unwrap();
        assert_eq!(value["type"], "application/pdf");
        assert_eq!(value["size"], 4);
        assert!(value.get("path").is_none());
    }
}
