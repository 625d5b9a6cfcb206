//! Answer rows and answer identifiers

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random part of an answer ID
pub const ANSWER_ID_SUFFIX_LEN: usize = 10;

/// What a voter submits: one selection per question plus free text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Answer {
    /// One entry per question, an index into that question's options
    pub results: Vec<i64>,
    pub name: String,
    pub comment: String,
    /// Token proving the right to change or delete this answer later
    pub change_secret: String,
}

impl Answer {
    pub fn new(
        results: Vec<i64>,
        name: impl Into<String>,
        comment: impl Into<String>,
        change_secret: impl Into<String>,
    ) -> Self {
        Self {
            results,
            name: name.into(),
            comment: comment.into(),
            change_secret: change_secret.into(),
        }
    }
}

/// A stored answer together with its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRow {
    /// Empty for rows loaded from files that predate answer IDs
    pub answer_id: String,
    pub answer: Answer,
}

/// Build an answer ID: `<counter>-<random alphanumeric suffix>`
///
/// The counter keeps IDs unique within a poll, the suffix keeps them
/// unguessable.
pub fn generate_answer_id(counter: u64) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ANSWER_ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", counter, suffix)
}
