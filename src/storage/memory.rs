//! In-memory storage backend.
//!
//! Nothing written here touches the filesystem. Used for dry runs, where prior
//! indexes can still be read from a [`LocalStorage`] so that deduplication
//! behaves as in a real run, and as a fake in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Meta, Record, RecordId};
use crate::storage::{IndexSink, LocalStorage, MetaSink, RecordPersister, StorageBackend};

#[derive(Debug, Default)]
struct MemoryState {
    indexes: HashMap<String, Vec<u8>>,
    metas: HashMap<String, Meta>,
    records: HashMap<String, HashMap<RecordId, Record>>,
}

/// Storage backend that keeps everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
    read_through: Option<LocalStorage>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read prior indexes from `local` while keeping all writes in memory.
    pub fn over(local: LocalStorage) -> Self {
        Self {
            state: Arc::default(),
            read_through: Some(local),
        }
    }

    /// Seed the index of `source` as if a previous run had written it.
    pub fn with_index(self, source: &str, content: &str) -> Self {
        self.lock()
            .indexes
            .insert(source.to_string(), content.as_bytes().to_vec());
        self
    }

    /// Raw index content written for `source`, including any seed.
    pub fn index(&self, source: &str) -> String {
        self.lock()
            .indexes
            .get(source)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    pub fn meta(&self, source: &str) -> Option<Meta> {
        self.lock().metas.get(source).cloned()
    }

    pub fn record(&self, source: &str, id: &RecordId) -> Option<Record> {
        self.lock().records.get(source)?.get(id).cloned()
    }

    pub fn record_count(&self, source: &str) -> usize {
        self.lock().records.get(source).map_or(0, HashMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // The state stays consistent even if a holder panicked mid-test.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn read_index(&self, source: &str) -> Result<String> {
        let seeded = self
            .lock()
            .indexes
            .get(source)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
        if let Some(text) = seeded {
            return Ok(text);
        }
        match &self.read_through {
            Some(local) => local.read_index(source).await,
            None => Ok(String::new()),
        }
    }

    fn record_persister(&self, source: &str) -> Box<dyn RecordPersister> {
        Box::new(MemoryHandle {
            storage: self.clone(),
            source: source.to_string(),
        })
    }

    fn index_sink(&self, source: &str) -> Box<dyn IndexSink> {
        Box::new(MemoryHandle {
            storage: self.clone(),
            source: source.to_string(),
        })
    }

    fn meta_sink(&self, source: &str) -> Box<dyn MetaSink> {
        Box::new(MemoryHandle {
            storage: self.clone(),
            source: source.to_string(),
        })
    }
}

/// Per-source view of a [`MemoryStorage`].
#[derive(Debug)]
struct MemoryHandle {
    storage: MemoryStorage,
    source: String,
}

#[async_trait]
impl RecordPersister for MemoryHandle {
    async fn persist(&self, record: &Record) -> Result<()> {
        let id = record
            .id
            .clone()
            .ok_or_else(|| AppError::persistence(&record.link, "record has no id"))?;
        self.storage
            .lock()
            .records
            .entry(self.source.clone())
            .or_default()
            .insert(id, record.clone());
        Ok(())
    }
}

#[async_trait]
impl IndexSink for MemoryHandle {
    async fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.storage
            .lock()
            .indexes
            .entry(self.source.clone())
            .or_default()
            .extend_from_slice(bytes);
        Ok(())
    }
}

#[async_trait]
impl MetaSink for MemoryHandle {
    async fn replace(&mut self, meta: &Meta) -> Result<()> {
        self.storage
            .lock()
            .metas
            .insert(self.source.clone(), meta.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_appends_extend_seeded_index() {
        let storage = MemoryStorage::new().with_index("s", "https://a/1\n");
        storage.index_sink("s").append(b"https://a/2\n").await.unwrap();

        assert_eq!(storage.index("s"), "https://a/1\nhttps://a/2\n");
        assert_eq!(storage.index("other"), "");
    }

    #[tokio::test]
    async fn test_read_through_local_index() {
        let tmp = TempDir::new().unwrap();
        let local = LocalStorage::new(tmp.path());
        std::fs::write(local.index_path("s"), "https://a/1\n").unwrap();

        let storage = MemoryStorage::over(local.clone());
        assert_eq!(storage.read_index("s").await.unwrap(), "https://a/1\n");

        storage.index_sink("s").append(b"https://a/2\n").await.unwrap();
        // Dry-run writes never reach the disk
        assert_eq!(local.read_index("s").await.unwrap(), "https://a/1\n");
    }

    #[tokio::test]
    async fn test_meta_last_write_wins() {
        let storage = MemoryStorage::new();
        let mut sink = storage.meta_sink("s");
        let mut meta = Meta {
            source: "s".to_string(),
            home_page: "https://a/".to_string(),
            name: "A".to_string(),
        };
        sink.replace(&meta).await.unwrap();
        meta.name = "B".to_string();
        sink.replace(&meta).await.unwrap();

        assert_eq!(storage.meta("s").unwrap().name, "B");
    }
}
