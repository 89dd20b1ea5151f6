//! Per-source deduplicating record store.
//!
//! A [`Store`] remembers which links were accepted in earlier runs (rebuilt
//! from the append-only index by [`Store::load`]) and accepts new records
//! through [`Store::save`], which writes the record before indexing its link.
//! A crash between the two steps leaves the link unindexed, so the next run
//! fetches it again and rewrites the same `<id>.json`; a link is never marked
//! as seen without its record on disk.
//!
//! A store has a single writer: all mutating methods take `&mut self`.

pub mod identity;

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{Meta, Record};
use crate::storage::{IndexSink, MetaSink, RecordPersister, StorageBackend};
use crate::utils::is_well_formed;

pub use identity::identify;

/// Written before the next line when the index may end mid-line. The space
/// leaves the partial line permanently malformed, so it is never loaded as a
/// link.
const FRAGMENT_TERMINATOR: &str = " \n";

/// What [`Store::load`] found in a prior index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Well-formed index lines (duplicates included)
    pub entries: usize,
    /// Malformed or truncated lines that were ignored
    pub skipped: usize,
    /// The index did not end with a newline
    pub truncated_tail: bool,
}

/// Deduplicating store for one source.
pub struct Store {
    source: String,
    seen: HashSet<String>,
    loaded: bool,
    // The index may end mid-line; the next append must close it off first.
    needs_line_break: bool,
    persister: Box<dyn RecordPersister>,
    index: Box<dyn IndexSink>,
    meta: Box<dyn MetaSink>,
}

impl Store {
    pub fn new(
        source: impl Into<String>,
        persister: Box<dyn RecordPersister>,
        index: Box<dyn IndexSink>,
        meta: Box<dyn MetaSink>,
    ) -> Self {
        Self {
            source: source.into(),
            seen: HashSet::new(),
            loaded: false,
            needs_line_break: false,
            persister,
            index,
            meta,
        }
    }

    /// Build a store for `source` on `backend` and load its prior index.
    pub async fn open(backend: &dyn StorageBackend, source: &str) -> Result<(Self, LoadReport)> {
        let prior = backend.read_index(source).await?;
        let mut store = Self::new(
            source,
            backend.record_persister(source),
            backend.index_sink(source),
            backend.meta_sink(source),
        );
        let report = store.load(&prior)?;
        Ok((store, report))
    }

    /// Number of distinct links known to this store.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Populate the membership set from the prior index content.
    ///
    /// Blank lines are ignored. Malformed lines and an unterminated final line
    /// (the trace of a crash mid-append) are skipped with a warning; loading
    /// continues with the following lines. Must be called exactly once,
    /// before any [`save`](Self::save).
    pub fn load(&mut self, prior_index: &str) -> Result<LoadReport> {
        if self.loaded {
            return Err(AppError::state(format!(
                "index of {} already loaded",
                self.source
            )));
        }
        self.loaded = true;

        let mut report = LoadReport::default();
        let (complete, tail) = match prior_index.rfind('\n') {
            Some(pos) => (&prior_index[..pos], &prior_index[pos + 1..]),
            None => ("", prior_index),
        };

        for (number, raw) in complete.split('\n').enumerate() {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.trim().is_empty() {
                continue;
            }
            if !is_well_formed(line) {
                log::warn!(
                    "[{}] skipping malformed index line {}: {:?}",
                    self.source,
                    number + 1,
                    line
                );
                report.skipped += 1;
                continue;
            }
            self.seen.insert(line.to_string());
            report.entries += 1;
        }

        if !tail.is_empty() {
            log::warn!(
                "[{}] skipping truncated final index line: {:?}",
                self.source,
                tail
            );
            report.skipped += 1;
            report.truncated_tail = true;
            self.needs_line_break = true;
        }

        log::debug!(
            "[{}] loaded {} indexed links ({} skipped)",
            self.source,
            self.seen.len(),
            report.skipped
        );
        Ok(report)
    }

    /// Whether `link` was accepted before.
    pub fn url_exists(&self, link: &str) -> bool {
        self.seen.contains(link)
    }

    /// Accept a record: persist it under its content id, then index its link.
    ///
    /// The link is added to the index and to the membership set only after
    /// the record has been persisted. Nothing is retried; on error the link
    /// stays unknown. Calling this twice for one link persists and indexes it
    /// twice; checking [`url_exists`](Self::url_exists) first is the caller's
    /// job.
    pub async fn save(&mut self, mut record: Record) -> Result<Record> {
        if !self.loaded {
            return Err(AppError::state(format!(
                "save called before the index of {} was loaded",
                self.source
            )));
        }
        if record.link.is_empty() || record.link.contains(['\n', '\r']) {
            return Err(AppError::validation(format!(
                "link {:?} cannot be written as an index line",
                record.link
            )));
        }

        let id = identify(&record);
        record.id = Some(id.clone());

        self.persister.persist(&record).await.map_err(|e| {
            AppError::persistence(&record.link, format!("writing record {id}: {e}"))
        })?;

        let line = if self.needs_line_break {
            format!("{FRAGMENT_TERMINATOR}{}\n", record.link)
        } else {
            format!("{}\n", record.link)
        };
        if let Err(e) = self.index.append(line.as_bytes()).await {
            // Part of the line may have reached the index.
            self.needs_line_break = true;
            return Err(AppError::persistence(
                &record.link,
                format!("appending to index: {e}"),
            ));
        }
        self.needs_line_break = false;

        self.seen.insert(record.link.clone());
        Ok(record)
    }

    /// Replace the source's meta document.
    pub async fn write_meta(&mut self, meta: &Meta) -> Result<()> {
        self.meta
            .replace(meta)
            .await
            .map_err(|e| AppError::meta_write(&self.source, e))
    }
}
