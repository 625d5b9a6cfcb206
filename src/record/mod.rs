//! Poll Record Module
//!
//! The full state of one poll: its opaque configuration blob and the ordered
//! list of answers submitted to it.
//!
//! ## Invariants
//! - Rows stay in submission order
//! - `answer_counter` only grows, so answer IDs are never reused even after
//!   rows are deleted
//! - An empty `config` means no poll was ever created under this identifier

mod answer;

use std::time::Instant;

pub use answer::{generate_answer_id, Answer, AnswerRow, ANSWER_ID_SUFFIX_LEN};

/// Everything stored for a single poll
#[derive(Debug, Clone)]
pub struct PollRecord {
    /// Poll definition, owned and interpreted by the caller
    pub config: Vec<u8>,

    /// Answers in submission order
    pub rows: Vec<AnswerRow>,

    /// Identity of the poll creator (empty if unknown)
    pub creator: String,

    /// Soft-delete flag; the file is removed by the next GC pass
    pub deleted: bool,

    /// Number of answer IDs ever handed out
    pub answer_counter: u64,

    /// Last read or write, drives eviction order (not persisted)
    pub last_access: Instant,
}

/// Equality ignores `last_access`.
impl PartialEq for PollRecord {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config
            && self.rows == other.rows
            && self.creator == other.creator
            && self.deleted == other.deleted
            && self.answer_counter == other.answer_counter
    }
}

impl Default for PollRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// All answers of a poll as parallel sequences of equal length
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollResults {
    pub results: Vec<Vec<i64>>,
    pub names: Vec<String>,
    pub comments: Vec<String>,
    pub answer_ids: Vec<String>,
}

impl PollResults {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A single answer as shown to a voter (without its change secret)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleResult {
    pub results: Vec<i64>,
    pub name: String,
    pub comment: String,
}

impl PollRecord {
    /// Create an empty, unconfigured record
    pub fn new() -> Self {
        Self {
            config: Vec::new(),
            rows: Vec::new(),
            creator: String::new(),
            deleted: false,
            answer_counter: 0,
            last_access: Instant::now(),
        }
    }

    /// Refresh the access timestamp
    pub fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    /// Whether a poll was ever created here
    pub fn is_configured(&self) -> bool {
        !self.config.is_empty()
    }

    /// Whether GC may remove this record's file
    pub fn is_collectable(&self) -> bool {
        self.deleted || !self.is_configured()
    }

    /// Append an answer and return its freshly assigned ID
    pub fn push_answer(&mut self, answer: Answer) -> String {
        self.answer_counter += 1;
        let answer_id = generate_answer_id(self.answer_counter);
        self.rows.push(AnswerRow {
            answer_id: answer_id.clone(),
            answer,
        });
        answer_id
    }

    /// Locate a row by answer ID
    ///
    /// An empty ID never matches: legacy rows without IDs are not addressable.
    pub fn position(&self, answer_id: &str) -> Option<usize> {
        if answer_id.is_empty() {
            return None;
        }
        self.rows.iter().position(|row| row.answer_id == answer_id)
    }

    pub fn find(&self, answer_id: &str) -> Option<&AnswerRow> {
        self.position(answer_id).map(|i| &self.rows[i])
    }

    /// Replace the answer stored under `answer_id`, keeping its position
    ///
    /// Returns false if no such row exists.
    pub fn overwrite(&mut self, answer_id: &str, answer: Answer) -> bool {
        match self.position(answer_id) {
            Some(i) => {
                self.rows[i].answer = answer;
                true
            }
            None => false,
        }
    }

    /// Remove a row, keeping the relative order of the rest
    pub fn remove(&mut self, answer_id: &str) -> Option<AnswerRow> {
        self.position(answer_id).map(|i| self.rows.remove(i))
    }

    /// Flag the poll as deleted and forget who created it
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
        self.creator.clear();
    }

    /// Split the rows into parallel sequences
    pub fn results(&self) -> PollResults {
        let mut out = PollResults {
            results: Vec::with_capacity(self.rows.len()),
            names: Vec::with_capacity(self.rows.len()),
            comments: Vec::with_capacity(self.rows.len()),
            answer_ids: Vec::with_capacity(self.rows.len()),
        };
        for row in &self.rows {
            out.results.push(row.answer.results.clone());
            out.names.push(row.answer.name.clone());
            out.comments.push(row.answer.comment.clone());
            out.answer_ids.push(row.answer_id.clone());
        }
        out
    }

    pub fn single_result(&self, answer_id: &str) -> Option<SingleResult> {
        self.find(answer_id).map(|row| SingleResult {
            results: row.answer.results.clone(),
            name: row.answer.name.clone(),
            comment: row.answer.comment.clone(),
        })
    }
}
