//! Hot Record Table
//!
//! In-memory working set of poll records, backed by one file per poll.
//!
//! ## Responsibilities
//! - Load records from disk on first access (or start them empty)
//! - Persist single records or the whole working set
//! - Evict records (persist, then drop from memory)
//! - Rank records for eviction, least recently used first
//!
//! The table does no locking of its own; the owning `FileSafe` serializes
//! every access behind one mutex.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::codec;
use crate::error::Result;
use crate::record::PollRecord;

/// Hot poll records keyed by internal identifier
#[derive(Debug)]
pub struct RecordTable {
    /// Storage directory, one file per internal identifier
    dir: PathBuf,

    records: HashMap<String, PollRecord>,
}

impl RecordTable {
    /// Create an empty table over `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            records: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the record with the given internal identifier
    pub fn file_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    /// Number of hot records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Internal identifiers of all hot records (unordered)
    pub fn ids(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// Hot record without loading or touching it
    pub fn peek(&self, id: &str) -> Option<&PollRecord> {
        self.records.get(id)
    }

    /// Hot record for `id`, loading it from disk if needed
    ///
    /// Refreshes the record's access time.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut PollRecord> {
        if !self.records.contains_key(id) {
            let record = codec::read_record(&self.file_path(id))?;
            tracing::trace!(id, configured = record.is_configured(), "loaded poll record");
            self.records.insert(id.to_string(), record);
        }

        let record = self
            .records
            .entry(id.to_string())
            .or_insert_with(PollRecord::new);
        record.touch();
        Ok(record)
    }

    /// Write a hot record to disk, keeping it in memory
    ///
    /// Returns whether a file was written (unconfigured records are skipped)
    /// or `false` if the record is not hot.
    pub fn persist(&self, id: &str) -> Result<bool> {
        match self.records.get(id) {
            Some(record) => codec::write_record(&self.file_path(id), record),
            None => Ok(false),
        }
    }

    /// Persist a record, then drop it from memory
    ///
    /// The record is dropped even when persisting fails; the error is returned
    /// so the caller can report it.
    pub fn evict(&mut self, id: &str) -> Result<bool> {
        let persisted = self.persist(id);
        self.records.remove(id);
        persisted
    }

    /// Drop a record from memory without persisting it
    pub fn forget(&mut self, id: &str) -> Option<PollRecord> {
        self.records.remove(id)
    }

    /// Persist every hot record
    ///
    /// Failures are logged and skipped. Returns the number of records written.
    pub fn persist_all(&self) -> usize {
        let mut written = 0;
        for (id, record) in &self.records {
            match codec::write_record(&self.file_path(id), record) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(id = %id, error = %e, "failed to persist poll record"),
            }
        }
        written
    }

    /// Drop every hot record without persisting
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Hot identifiers ordered for eviction: oldest access first, ties by
    /// identifier
    pub fn eviction_order(&self) -> Vec<String> {
        let mut ranked: Vec<(&String, &PollRecord)> = self.records.iter().collect();
        ranked.sort_by(|(a_id, a), (b_id, b)| {
            a.last_access
                .cmp(&b.last_access)
                .then_with(|| a_id.cmp(b_id))
        });
        ranked.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Hot identifiers whose record is flagged deleted
    pub fn deleted_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|(_, record)| record.deleted)
            .map(|(id, _)| id.clone())
            .collect()
    }
}
