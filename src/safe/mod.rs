//! Data Safe Module
//!
//! The storage interface consumed by the poll request handlers, and the
//! file-backed implementation.
//!
//! ## Contract
//! - Results of a poll are returned in the order they were added
//! - Every method is safe to call from many threads at once
//! - Every method fails with `NotActive` until `load_config` succeeded and
//!   after `flush_and_close`
//! - Data is only guaranteed to be on disk once `flush_and_close` returned

mod file_safe;

pub use file_safe::FileSafe;
pub(crate) use file_safe::State;

use crate::error::Result;
use crate::gc::GcReport;
use crate::record::{Answer, PollResults, SingleResult};

/// Backend for storing poll configuration and results
pub trait DataSafe: Send + Sync {
    /// Append an answer to a poll and return its new answer ID
    fn save_result(&self, poll_id: &str, answer: Answer) -> Result<String>;

    /// Replace an existing answer in place
    fn overwrite_result(&self, poll_id: &str, answer_id: &str, answer: Answer) -> Result<()>;

    /// All answers of a poll in submission order
    fn get_results(&self, poll_id: &str) -> Result<PollResults>;

    fn get_single_result(&self, poll_id: &str, answer_id: &str) -> Result<SingleResult>;

    /// Remove one answer, keeping the order of the others
    fn delete_row(&self, poll_id: &str, answer_id: &str) -> Result<()>;

    fn save_config(&self, poll_id: &str, config: &[u8]) -> Result<()>;

    fn get_config(&self, poll_id: &str) -> Result<Vec<u8>>;

    fn save_creator(&self, poll_id: &str, creator: &str) -> Result<()>;

    fn get_creator(&self, poll_id: &str) -> Result<String>;

    /// Soft delete: the poll's data is removed by the next `run_gc`
    fn mark_deleted(&self, poll_id: &str) -> Result<()>;

    /// Secret that authorizes changing or deleting an answer
    fn get_change_secret(&self, poll_id: &str, answer_id: &str) -> Result<String>;

    /// Remove deleted and never-created polls from storage
    fn run_gc(&self) -> Result<GcReport>;

    /// Initialize the backend from its JSON settings
    fn load_config(&self, settings: &[u8]) -> Result<()>;

    /// Write everything to durable storage and deactivate
    ///
    /// Blocks until done. Calling it again, or concurrently, is harmless.
    fn flush_and_close(&self);
}
