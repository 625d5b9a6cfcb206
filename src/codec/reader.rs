//! Record Reader
//!
//! Decodes poll record files of every known format version.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Result, SafeError};
use crate::record::{Answer, AnswerRow, PollRecord};

use super::{HEADER_SIZE, MAGIC, VERSION, VERSION_ANSWER_IDS};

/// Read the record stored at `path`
///
/// A missing file is not an error: nothing was ever saved there, so an empty
/// record is returned.
pub fn read_record(path: &Path) -> Result<PollRecord> {
    match fs::read(path) {
        Ok(bytes) => decode(&bytes).map_err(|e| match e {
            SafeError::Corruption(msg) => {
                SafeError::Corruption(format!("{}: {}", path.display(), msg))
            }
            other => other,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(PollRecord::new()),
        Err(e) => Err(e.into()),
    }
}

/// Decode a record from file bytes
pub fn decode(bytes: &[u8]) -> Result<PollRecord> {
    if bytes.len() < HEADER_SIZE {
        return Err(SafeError::Corruption(format!(
            "incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(SafeError::Corruption(format!(
            "invalid magic: expected PSAF, got {:?}",
            &bytes[0..4]
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version == 0 || version > VERSION {
        return Err(SafeError::Corruption(format!(
            "unsupported format version: {}",
            version
        )));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[6..14]);
    let body_len = u64::from_le_bytes(len_bytes) as usize;
    let body_crc = u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]);

    let available = bytes.len() - HEADER_SIZE;
    if available < body_len {
        return Err(SafeError::Corruption(format!(
            "truncated body: expected {} bytes, got {}",
            body_len, available
        )));
    }

    let body = &bytes[HEADER_SIZE..HEADER_SIZE + body_len];
    if crc32fast::hash(body) != body_crc {
        return Err(SafeError::Corruption("body checksum mismatch".to_string()));
    }

    decode_body(body, version)
}

/// Decode the body fields present in `version`, defaulting the rest
fn decode_body(mut body: &[u8], version: u16) -> Result<PollRecord> {
    let results: Vec<Vec<i64>> = next_field(&mut body)?;
    let names: Vec<String> = next_field(&mut body)?;
    let comments: Vec<String> = next_field(&mut body)?;
    let config: Vec<u8> = next_field(&mut body)?;
    let deleted: bool = next_field(&mut body)?;
    let creator: String = next_field(&mut body)?;

    let (mut change_secrets, mut answer_ids, answer_counter) = if version >= VERSION_ANSWER_IDS {
        let change_secrets: Vec<String> = next_field(&mut body)?;
        let answer_ids: Vec<String> = next_field(&mut body)?;
        let answer_counter: u64 = next_field(&mut body)?;
        (change_secrets, answer_ids, answer_counter)
    } else {
        (Vec::new(), Vec::new(), 0)
    };

    if results.len() != names.len() || comments.len() != names.len() {
        return Err(SafeError::Corruption(format!(
            "row fields disagree: {} results, {} names, {} comments",
            results.len(),
            names.len(),
            comments.len()
        )));
    }

    if change_secrets.len() > names.len() || answer_ids.len() > names.len() {
        return Err(SafeError::Corruption(format!(
            "more per-row fields than rows: {} rows, {} change secrets, {} answer ids",
            names.len(),
            change_secrets.len(),
            answer_ids.len()
        )));
    }

    // Older files carry fewer per-row fields; pad them out
    if change_secrets.len() < names.len() {
        change_secrets.resize(names.len(), String::new());
    }
    if answer_ids.len() < names.len() {
        answer_ids.resize(names.len(), String::new());
    }

    let rows = results
        .into_iter()
        .zip(names)
        .zip(comments)
        .zip(change_secrets)
        .zip(answer_ids)
        .map(|((((results, name), comment), change_secret), answer_id)| AnswerRow {
            answer_id,
            answer: Answer {
                results,
                name,
                comment,
                change_secret,
            },
        })
        .collect();

    let mut record = PollRecord::new();
    record.config = config;
    record.rows = rows;
    record.creator = creator;
    record.deleted = deleted;
    record.answer_counter = answer_counter;
    Ok(record)
}

fn next_field<T: DeserializeOwned>(body: &mut &[u8]) -> Result<T> {
    bincode::deserialize_from(body).map_err(|e| {
        SafeError::Corruption(format!("malformed field: {}", e))
    })
}
