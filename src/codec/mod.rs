//! Persistence Codec
//!
//! Serializes a [`PollRecord`](crate::record::PollRecord) to one file per poll.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                               │
//! │   Magic: "PSAF" (4) | Version: u16 (2) | BodyLen: u64 (8)       │
//! │   BodyCRC: u32 (4)                                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Body (BodyLen bytes, bincode fields back to back)               │
//! │   v1: results | names | comments | config | deleted | creator   │
//! │   v2: v1 fields | change_secrets | answer_ids | answer_counter  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The writer always emits [`VERSION`]. The reader accepts every version up
//! to it; fields a version does not carry come back empty (counter 0).
//! Integers in the header are little-endian.

mod reader;
mod writer;

pub use reader::{decode, read_record};
pub use writer::{encode, write_record};

// =============================================================================
// Shared Constants
// =============================================================================

/// Magic bytes identifying a poll record file
pub const MAGIC: &[u8; 4] = b"PSAF";

/// Current record format version
pub const VERSION: u16 = 2;

/// First version that stores change secrets, answer IDs and the counter
pub const VERSION_ANSWER_IDS: u16 = 2;

/// Header size: Magic (4) + Version (2) + BodyLen (8) + BodyCRC (4) = 18 bytes
pub const HEADER_SIZE: usize = 18;
