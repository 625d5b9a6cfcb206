//! Record Writer
//!
//! Encodes a poll record and writes it to its file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

use crate::error::{Result, SafeError};
use crate::record::PollRecord;

use super::{HEADER_SIZE, MAGIC, VERSION};

/// Encode a record into the current file format
pub fn encode(record: &PollRecord) -> Result<Vec<u8>> {
    let body = encode_body(record)?;

    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(body.len() as u64).to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    out.extend_from_slice(&body);

    Ok(out)
}

/// Write a record to `path`, replacing any previous content
///
/// Records without a configuration are never written, and a file left from
/// an earlier configured state is removed. Returns whether the file was
/// written.
pub fn write_record(path: &Path, record: &PollRecord) -> Result<bool> {
    if !record.is_configured() {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(file = %path.display(), "removed file of unconfigured poll"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        return Ok(false);
    }

    let bytes = encode(record)?;

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;

    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;

    let file: File = writer
        .into_inner()
        .map_err(|e| SafeError::Io(e.into_error()))?;
    file.sync_all()?;

    Ok(true)
}

/// Body fields in file order. Borrowed slices encode exactly like the owned
/// vectors the reader decodes into.
fn encode_body(record: &PollRecord) -> Result<Vec<u8>> {
    let results: Vec<&[i64]> = record
        .rows
        .iter()
        .map(|r| r.answer.results.as_slice())
        .collect();
    let names: Vec<&str> = record.rows.iter().map(|r| r.answer.name.as_str()).collect();
    let comments: Vec<&str> = record
        .rows
        .iter()
        .map(|r| r.answer.comment.as_str())
        .collect();
    let change_secrets: Vec<&str> = record
        .rows
        .iter()
        .map(|r| r.answer.change_secret.as_str())
        .collect();
    let answer_ids: Vec<&str> = record.rows.iter().map(|r| r.answer_id.as_str()).collect();

    let mut body = Vec::new();

    // v1
    bincode::serialize_into(&mut body, &results)?;
    bincode::serialize_into(&mut body, &names)?;
    bincode::serialize_into(&mut body, &comments)?;
    bincode::serialize_into(&mut body, &record.config)?;
    bincode::serialize_into(&mut body, &record.deleted)?;
    bincode::serialize_into(&mut body, &record.creator)?;

    // v2
    bincode::serialize_into(&mut body, &change_secrets)?;
    bincode::serialize_into(&mut body, &answer_ids)?;
    bincode::serialize_into(&mut body, &record.answer_counter)?;

    Ok(body)
}
