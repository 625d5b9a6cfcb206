//! Garbage Collector
//!
//! Removes files of polls that were deleted or never created.
//!
//! Two phases:
//! 1. Hot records flagged deleted are persisted and dropped from memory, so
//!    the disk holds their tombstone.
//! 2. Every regular file in the storage directory is decoded; files whose
//!    record is deleted or has no configuration are removed.
//!
//! Hot records are authoritative and their files are left alone in phase 2.
//! Files that fail to decode are logged and left on disk.

use std::fs;

use crate::codec;
use crate::error::{Result, SafeError};
use crate::table::RecordTable;

/// Outcome of one GC pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GcReport {
    /// Deleted hot records dropped from memory in phase 1
    pub dropped_from_memory: usize,

    /// Files removed from disk
    pub removed: usize,

    /// Files that could not be decoded
    pub skipped: usize,
}

/// Run a full GC pass over `table` and its directory
pub fn collect(table: &mut RecordTable) -> Result<GcReport> {
    let mut report = GcReport::default();

    // Phase 1: tombstone deleted hot records on disk
    for id in table.deleted_ids() {
        table.persist(&id)?;
        table.forget(&id);
        report.dropped_from_memory += 1;
    }

    // Phase 2: scan the directory
    for entry in fs::read_dir(table.dir())? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                tracing::warn!(file = ?name, "skipping non UTF-8 file name");
                report.skipped += 1;
                continue;
            }
        };

        if table.contains(&name) {
            continue;
        }

        let path = entry.path();
        let record = match codec::read_record(&path) {
            Ok(record) => record,
            Err(e @ (SafeError::Corruption(_) | SafeError::Serialization(_))) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping undecodable file");
                report.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        if record.is_collectable() {
            fs::remove_file(&path)?;
            report.removed += 1;
        }
    }

    tracing::info!(
        removed = report.removed,
        skipped = report.skipped,
        "gc removed resources from disc"
    );

    Ok(report)
}
