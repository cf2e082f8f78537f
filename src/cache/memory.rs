//! In-memory document cache

use super::traits::{CacheKey, CacheResult, CachedDocument, DocumentCache};
use dashmap::DashMap;

/// Document cache held in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryDocumentCache {
    records: DashMap<CacheKey, CachedDocument>,
}

impl MemoryDocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DocumentCache for MemoryDocumentCache {
    fn save(&self, key: CacheKey, document: &CachedDocument) -> CacheResult<()> {
        self.records.insert(key, document.clone());
        Ok(())
    }

    fn load(&self, key: CacheKey) -> CacheResult<Option<CachedDocument>> {
        Ok(self.records.get(&key).map(|r| r.clone()))
    }

    fn remove(&self, key: CacheKey) -> CacheResult<bool> {
        Ok(self.records.remove(&key).is_some())
    }
}
