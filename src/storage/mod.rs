//! Storage capabilities used by the [`Store`](crate::store::Store).
//!
//! Each source owns three disjoint artifacts under the data directory:
//!
//! ```text
//! data/
//! ├── antonz.org.txt          # Index: one accepted link per line, append-only
//! ├── antonz.org.meta.json    # Meta: fully rewritten every run
//! └── antonz.org.d/           # Records: one immutable document per id
//!     └── <id>.json
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Meta, Record};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Durably writes one record's full representation, keyed by its id.
#[async_trait]
pub trait RecordPersister: Send + Sync {
    /// Persist `record`, whose `id` is already set.
    ///
    /// Returning `Ok` means the record survives a crash.
    async fn persist(&self, record: &Record) -> Result<()>;
}

/// Append-only byte sink backing the link index.
#[async_trait]
pub trait IndexSink: Send {
    /// Append `bytes` at the end of the index.
    async fn append(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Full-overwrite sink backing the meta document.
#[async_trait]
pub trait MetaSink: Send {
    /// Replace the whole meta document with `meta`.
    async fn replace(&mut self, meta: &Meta) -> Result<()>;
}

/// A place where per-source indexes, metadata and records live.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the prior index of `source`; empty when the source is new.
    async fn read_index(&self, source: &str) -> Result<String>;

    fn record_persister(&self, source: &str) -> Box<dyn RecordPersister>;

    fn index_sink(&self, source: &str) -> Box<dyn IndexSink>;

    fn meta_sink(&self, source: &str) -> Box<dyn MetaSink>;
}
