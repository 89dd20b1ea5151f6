//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── {source}.txt          # Index (append-only)
//! ├── {source}.meta.json    # Meta (rewritten via temp file + rename)
//! └── {source}.d/
//!     └── {id}.json         # Records (written via temp file + rename)
//! ```
//!
//! Record and meta writes go through a temporary sibling file that is synced
//! and then renamed over the target, so readers never observe a half-written
//! document. Index appends are synced before returning.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Meta, Record};
use crate::storage::{IndexSink, MetaSink, RecordPersister, StorageBackend};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn index_path(&self, source: &str) -> PathBuf {
        self.root_dir.join(format!("{source}.txt"))
    }

    pub fn meta_path(&self, source: &str) -> PathBuf {
        self.root_dir.join(format!("{source}.meta.json"))
    }

    pub fn records_dir(&self, source: &str) -> PathBuf {
        self.root_dir.join(format!("{source}.d"))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn read_index(&self, source: &str) -> Result<String> {
        let path = self.index_path(source);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No index at {}, starting empty", path.display());
                return Ok(String::new());
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) => {
                log::warn!(
                    "Index {} is not valid UTF-8; damaged lines will be skipped",
                    path.display()
                );
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }

    fn record_persister(&self, source: &str) -> Box<dyn RecordPersister> {
        Box::new(LocalRecordPersister {
            dir: self.records_dir(source),
        })
    }

    fn index_sink(&self, source: &str) -> Box<dyn IndexSink> {
        Box::new(LocalIndex {
            path: self.index_path(source),
            file: None,
        })
    }

    fn meta_sink(&self, source: &str) -> Box<dyn MetaSink> {
        Box::new(LocalMeta {
            path: self.meta_path(source),
        })
    }
}

/// Writes `{dir}/{id}.json` for each accepted record.
#[derive(Debug)]
pub struct LocalRecordPersister {
    dir: PathBuf,
}

#[async_trait]
impl RecordPersister for LocalRecordPersister {
    async fn persist(&self, record: &Record) -> Result<()> {
        let id = record
            .id
            .as_ref()
            .ok_or_else(|| AppError::persistence(&record.link, "record has no id"))?;
        ensure_dir(&self.dir).await?;
        write_json(&self.dir.join(format!("{id}.json")), record).await
    }
}

/// Appends to `{source}.txt`, opening it lazily in append mode.
#[derive(Debug)]
pub struct LocalIndex {
    path: PathBuf,
    file: Option<tokio::fs::File>,
}

#[async_trait]
impl IndexSink for LocalIndex {
    async fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let mut file = match self.file.take() {
            Some(file) => file,
            None => self.open().await?,
        };
        let result = append_synced(&mut file, bytes).await;
        self.file = Some(file);
        result
    }
}

impl LocalIndex {
    async fn open(&self) -> Result<tokio::fs::File> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        // The index file itself may be new.
        if let Some(parent) = self.path.parent() {
            sync_dir(parent).await?;
        }
        Ok(file)
    }
}

async fn append_synced(file: &mut tokio::fs::File, bytes: &[u8]) -> Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await?;
    Ok(())
}

/// Rewrites `{source}.meta.json` on every call.
#[derive(Debug)]
pub struct LocalMeta {
    path: PathBuf,
}

#[async_trait]
impl MetaSink for LocalMeta {
    async fn replace(&mut self, meta: &Meta) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent).await?;
        }
        write_json(&self.path, meta).await
    }
}

/// Write JSON data atomically.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes(path, &bytes).await
}

/// Write bytes atomically (write to temp, sync, then rename).
async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    match path.parent() {
        Some(parent) => sync_dir(parent).await,
        None => Ok(()),
    }
}

/// Create `dir` if missing; a newly created directory is synced into its parent.
async fn ensure_dir(dir: &Path) -> Result<()> {
    if tokio::fs::try_exists(dir).await? {
        return Ok(());
    }
    tokio::fs::create_dir_all(dir).await?;
    sync_dir(dir).await?;
    match dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => sync_dir(parent).await,
        _ => Ok(()),
    }
}

/// Flush directory entries (creations and renames) to disk.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<()> {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    tokio::fs::File::open(dir).await?.sync_all().await?;
    Ok(())
}

// Directories cannot be opened for syncing here.
#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
