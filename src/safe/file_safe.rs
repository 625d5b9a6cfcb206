//! File-backed Data Safe
//!
//! Keeps recently used polls in memory and spills the rest to disk, one file
//! per poll.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Sender, TrySendError};
use parking_lot::Mutex;

use crate::config::SafeConfig;
use crate::error::{Result, SafeError};
use crate::gc::{self, GcReport};
use crate::ident;
use crate::record::{Answer, PollRecord, PollResults, SingleResult};
use crate::table::RecordTable;
use crate::worker::{self, Completion};

use super::DataSafe;

/// Everything behind the store lock
pub(crate) struct State {
    pub(crate) active: bool,
    pub(crate) settings: Option<SafeConfig>,
    pub(crate) table: RecordTable,

    /// Depth-1 channel asking the worker to flush and stop
    shutdown: Option<Sender<()>>,
    completion: Option<Arc<Completion>>,
    worker: Option<JoinHandle<()>>,
}

impl State {
    fn inactive() -> Self {
        Self {
            active: false,
            settings: None,
            table: RecordTable::new(PathBuf::new()),
            shutdown: None,
            completion: None,
            worker: None,
        }
    }

    /// Called by the worker once the table has been flushed
    pub(crate) fn deactivate(&mut self) {
        self.active = false;
        self.shutdown = None;
        self.completion = None;
    }
}

#[cfg(test)]
impl State {
    /// Active state over `settings.path` with no worker attached
    pub(crate) fn detached(settings: &SafeConfig) -> Self {
        Self {
            active: true,
            settings: Some(settings.clone()),
            table: RecordTable::new(settings.path.clone()),
            shutdown: None,
            completion: None,
            worker: None,
        }
    }
}

/// Data safe holding a bounded working set of polls in memory
///
/// ## Concurrency Model
///
/// A single mutex guards the hot record table and the lifecycle state. Every
/// public operation and every worker cycle holds it for its full duration, so
/// no operation ever observes a record mid-eviction or mid-flush.
///
/// ## Lifecycle
/// 1. `FileSafe::new()` creates an inactive store
/// 2. `load_config` / `activate` validates settings, creates the storage
///    directory and starts the worker
/// 3. `flush_and_close` persists everything and stops the worker
///
/// Dropping an active store flushes it.
pub struct FileSafe {
    state: Arc<Mutex<State>>,
}

impl Default for FileSafe {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSafe {
    /// Name under which this backend is registered
    pub const NAME: &'static str = "FileSafe";

    /// Create an inactive store
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::inactive())),
        }
    }

    /// Create and activate a store in one step
    pub fn open(config: SafeConfig) -> Result<Self> {
        let safe = Self::new();
        safe.activate(config)?;
        Ok(safe)
    }

    /// Activate with already parsed settings
    ///
    /// On any error the store stays inactive and no worker is started.
    pub fn activate(&self, config: SafeConfig) -> Result<()> {
        config.validate()?;

        let mut state = self.state.lock();
        if state.active {
            return Err(SafeError::AlreadyActive);
        }

        if config.is_low_ratio() {
            tracing::warn!(
                ratio = config.clear_after_ratio,
                "ClearAfterRatio is low - most polls will be removed on cleanup"
            );
        }

        fs::create_dir_all(&config.path)?;

        let (shutdown_tx, shutdown_rx) = bounded(1);
        let completion = Arc::new(Completion::new());
        let handle = worker::spawn(
            Arc::clone(&self.state),
            &config,
            shutdown_rx,
            Arc::clone(&completion),
        )?;

        tracing::info!(
            path = %config.path.display(),
            maximum_memory = config.maximum_memory,
            "file safe activated"
        );

        state.table = RecordTable::new(config.path.clone());
        state.settings = Some(config);
        state.shutdown = Some(shutdown_tx);
        state.completion = Some(completion);
        state.worker = Some(handle);
        state.active = true;
        Ok(())
    }

    // =========================================================================
    // Maintenance (normally driven by the worker)
    // =========================================================================

    /// Run one eviction check now; returns the evicted poll IDs in order
    pub fn clear_cycle(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        let (maximum, target) = match (&state.settings, state.active) {
            (Some(settings), true) => (settings.maximum_memory, settings.eviction_target()),
            _ => return Err(SafeError::NotActive),
        };
        let evicted = worker::clear_cycle(&mut state.table, maximum, target);
        Ok(evicted.iter().map(|id| ident::external_id(id)).collect())
    }

    /// Persist every hot poll now; returns the number of files written
    pub fn sync_cycle(&self) -> Result<usize> {
        let state = self.state.lock();
        if !state.active {
            return Err(SafeError::NotActive);
        }
        Ok(worker::sync_cycle(&state.table))
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Number of polls currently held in memory
    pub fn hot_count(&self) -> usize {
        self.state.lock().table.len()
    }

    /// Whether a poll is currently held in memory (does not load it)
    pub fn is_hot(&self, poll_id: &str) -> Result<bool> {
        let id = ident::internal_id(poll_id)?;
        Ok(self.state.lock().table.contains(&id))
    }

    /// Storage directory, once activated
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.state
            .lock()
            .settings
            .as_ref()
            .map(|settings| settings.path.clone())
    }

    /// Settings the store was activated with
    pub fn settings(&self) -> Option<SafeConfig> {
        self.state.lock().settings.clone()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Run `f` on the hot record for `poll_id` under the store lock
    fn with_record<T>(
        &self,
        poll_id: &str,
        f: impl FnOnce(&mut PollRecord) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock();
        if !state.active {
            return Err(SafeError::NotActive);
        }
        let id = ident::internal_id(poll_id)?;
        let record = state.table.get_mut(&id)?;
        f(record)
    }
}

fn unknown_answer(poll_id: &str, answer_id: &str) -> SafeError {
    SafeError::UnknownAnswer {
        poll_id: poll_id.to_string(),
        answer_id: answer_id.to_string(),
    }
}

impl DataSafe for FileSafe {
    fn save_result(&self, poll_id: &str, answer: Answer) -> Result<String> {
        self.with_record(poll_id, |record| Ok(record.push_answer(answer)))
    }

    fn overwrite_result(&self, poll_id: &str, answer_id: &str, answer: Answer) -> Result<()> {
        self.with_record(poll_id, |record| {
            if record.overwrite(answer_id, answer) {
                Ok(())
            } else {
                Err(unknown_answer(poll_id, answer_id))
            }
        })
    }

    fn get_results(&self, poll_id: &str) -> Result<PollResults> {
        self.with_record(poll_id, |record| Ok(record.results()))
    }

    fn get_single_result(&self, poll_id: &str, answer_id: &str) -> Result<SingleResult> {
        self.with_record(poll_id, |record| {
            record
                .single_result(answer_id)
                .ok_or_else(|| unknown_answer(poll_id, answer_id))
        })
    }

    fn delete_row(&self, poll_id: &str, answer_id: &str) -> Result<()> {
        self.with_record(poll_id, |record| {
            record
                .remove(answer_id)
                .map(|_| ())
                .ok_or_else(|| unknown_answer(poll_id, answer_id))
        })
    }

    fn save_config(&self, poll_id: &str, config: &[u8]) -> Result<()> {
        self.with_record(poll_id, |record| {
            record.config = config.to_vec();
            Ok(())
        })
    }

    fn get_config(&self, poll_id: &str) -> Result<Vec<u8>> {
        self.with_record(poll_id, |record| Ok(record.config.clone()))
    }

    fn save_creator(&self, poll_id: &str, creator: &str) -> Result<()> {
        self.with_record(poll_id, |record| {
            record.creator = creator.to_string();
            Ok(())
        })
    }

    fn get_creator(&self, poll_id: &str) -> Result<String> {
        self.with_record(poll_id, |record| Ok(record.creator.clone()))
    }

    fn mark_deleted(&self, poll_id: &str) -> Result<()> {
        self.with_record(poll_id, |record| {
            record.mark_deleted();
            Ok(())
        })
    }

    fn get_change_secret(&self, poll_id: &str, answer_id: &str) -> Result<String> {
        self.with_record(poll_id, |record| {
            record
                .find(answer_id)
                .map(|row| row.answer.change_secret.clone())
                .ok_or_else(|| unknown_answer(poll_id, answer_id))
        })
    }

    fn run_gc(&self) -> Result<GcReport> {
        let mut state = self.state.lock();
        if !state.active {
            return Err(SafeError::NotActive);
        }
        gc::collect(&mut state.table)
    }

    fn load_config(&self, settings: &[u8]) -> Result<()> {
        let config = SafeConfig::from_json(settings)?;
        self.activate(config)
    }

    fn flush_and_close(&self) {
        // Only the first closer takes the handle; later ones just wait
        let (shutdown, completion, handle) = {
            let mut state = self.state.lock();
            if !state.active {
                return;
            }
            let (tx, done) = match (&state.shutdown, &state.completion) {
                (Some(tx), Some(done)) => (tx.clone(), Arc::clone(done)),
                _ => return,
            };
            (tx, done, state.worker.take())
        };

        // A full channel means a flush is already requested
        match shutdown.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) if completion.is_done() => {}
            Err(TrySendError::Disconnected(())) => {
                tracing::error!("worker is gone, flushing on the calling thread");
                {
                    let mut state = self.state.lock();
                    if state.active {
                        worker::shutdown_flush(&mut state.table);
                        state.deactivate();
                    }
                }
                completion.signal();
            }
        }

        completion.wait();

        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}

impl Drop for FileSafe {
    fn drop(&mut self) {
        self.flush_and_close();
    }
}
