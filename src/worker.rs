//! Eviction / Sync Worker
//!
//! One background thread per activation of a [`FileSafe`](crate::FileSafe).
//! It waits on three event sources and handles each under the store lock:
//!
//! ```text
//!   clear tick ──────┐
//!   disc-sync tick ──┼──► select! ──► lock ──► clear / sync / flush
//!   shutdown request ┘
//! ```
//!
//! - **clear**: if the table holds more than `MaximumMemory` records, evict
//!   least recently used ones until `ceil(MaximumMemory * ClearAfterRatio)`
//!   remain
//! - **sync**: persist every hot record, keep them in memory
//! - **shutdown**: persist everything, empty the table, deactivate the store
//!   and fire the completion signal

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{never, tick, Receiver};
use crossbeam::select;
use parking_lot::{Condvar, Mutex};

use crate::config::SafeConfig;
use crate::safe::State;
use crate::table::RecordTable;

/// One-shot signal that any number of threads can wait on
#[derive(Debug, Default)]
pub struct Completion {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark as complete and wake every waiter
    pub fn signal(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.cond.notify_all();
    }

    /// Block until `signal` has been called
    pub fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }

    pub fn is_done(&self) -> bool {
        *self.done.lock()
    }
}

/// Tick periods driving the worker loop
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timing {
    pub(crate) clear: Duration,
    /// `None` disables periodic syncing
    pub(crate) sync: Option<Duration>,
}

impl Timing {
    pub(crate) fn from_settings(settings: &SafeConfig) -> Self {
        Self {
            clear: settings.clear_period(),
            sync: settings.sync_period(),
        }
    }
}

/// Start the worker thread for an activated store
pub(crate) fn spawn(
    state: Arc<Mutex<State>>,
    settings: &SafeConfig,
    requests: Receiver<()>,
    completion: Arc<Completion>,
) -> std::io::Result<JoinHandle<()>> {
    spawn_with_timing(
        state,
        settings,
        Timing::from_settings(settings),
        requests,
        completion,
    )
}

pub(crate) fn spawn_with_timing(
    state: Arc<Mutex<State>>,
    settings: &SafeConfig,
    timing: Timing,
    requests: Receiver<()>,
    completion: Arc<Completion>,
) -> std::io::Result<JoinHandle<()>> {
    let settings = settings.clone();
    thread::Builder::new()
        .name("pollsafe-worker".to_string())
        .spawn(move || run(state, settings, timing, requests, completion))
}

fn run(
    state: Arc<Mutex<State>>,
    settings: SafeConfig,
    timing: Timing,
    requests: Receiver<()>,
    completion: Arc<Completion>,
) {
    let clear = tick(timing.clear);
    let sync = match timing.sync {
        Some(period) => tick(period),
        None => never(),
    };
    let target = settings.eviction_target();

    tracing::debug!(
        clear_period = ?timing.clear,
        sync_period = ?timing.sync,
        "worker started"
    );

    loop {
        select! {
            recv(clear) -> _ => {
                let mut state = state.lock();
                clear_cycle(&mut state.table, settings.maximum_memory, target);
            }
            recv(sync) -> _ => {
                let state = state.lock();
                sync_cycle(&state.table);
            }
            // A closed channel means the owner is gone; flush all the same
            recv(requests) -> _ => {
                {
                    let mut state = state.lock();
                    shutdown_flush(&mut state.table);
                    state.deactivate();
                }
                completion.signal();
                tracing::debug!("worker stopped");
                return;
            }
        }
    }
}

/// Evict least recently used records until at most `target` remain
///
/// Does nothing unless the table holds more than `maximum` records. Returns
/// the evicted identifiers in eviction order.
pub fn clear_cycle(table: &mut RecordTable, maximum: usize, target: usize) -> Vec<String> {
    if table.len() <= maximum {
        return Vec::new();
    }

    let mut evicted = Vec::new();
    for id in table.eviction_order() {
        if table.len() <= target {
            break;
        }
        if let Err(e) = table.evict(&id) {
            tracing::warn!(id = %id, error = %e, "error saving evicted poll");
        }
        evicted.push(id);
    }

    tracing::info!(freed = evicted.len(), "freed resources from memory");
    evicted
}

/// Persist every hot record without evicting; returns the number written
pub fn sync_cycle(table: &RecordTable) -> usize {
    let written = table.persist_all();
    tracing::info!(synced = written, hot = table.len(), "synced resources to disc");
    written
}

/// Persist every hot record and empty the table
pub fn shutdown_flush(table: &mut RecordTable) -> usize {
    let written = table.persist_all();
    table.clear();
    tracing::info!(written, "flushed all resources to disc");
    written
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crossbeam::channel::bounded;
    use tempfile::TempDir;

    use super::*;

    const FAST: Duration = Duration::from_millis(10);
    const SLOW: Duration = Duration::from_secs(3600);

    fn settings(dir: &TempDir, maximum_memory: usize, ratio: f64) -> SafeConfig {
        SafeConfig::builder()
            .path(dir.path())
            .maximum_memory(maximum_memory)
            .clear_after_ratio(ratio)
            .build()
    }

    fn configure(state: &Mutex<State>, id: &str) {
        state.lock().table.get_mut(id).unwrap().config = b"config".to_vec();
    }

    /// Poll `check` until it holds or two seconds pass
    fn wait_until(mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        check()
    }

    struct Running {
        state: Arc<Mutex<State>>,
        requests: crossbeam::channel::Sender<()>,
        completion: Arc<Completion>,
        handle: JoinHandle<()>,
    }

    fn start(settings: &SafeConfig, timing: Timing, polls: &[&str]) -> Running {
        let state = Arc::new(Mutex::new(State::detached(settings)));
        for id in polls {
            configure(&state, id);
        }
        let (requests, receiver) = bounded(1);
        let completion = Arc::new(Completion::new());
        let handle = spawn_with_timing(
            Arc::clone(&state),
            settings,
            timing,
            receiver,
            Arc::clone(&completion),
        )
        .unwrap();
        Running {
            state,
            requests,
            completion,
            handle,
        }
    }

    fn stop(running: Running) -> Arc<Mutex<State>> {
        running.requests.send(()).unwrap();
        running.completion.wait();
        running.handle.join().unwrap();
        running.state
    }

    #[test]
    fn test_clear_tick_evicts() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, 1, 0.0);
        let timing = Timing {
            clear: FAST,
            sync: None,
        };
        let running = start(&settings, timing, &["p1", "p2"]);

        assert!(wait_until(|| running.state.lock().table.is_empty()));
        assert!(dir.path().join("p1").is_file());
        assert!(dir.path().join("p2").is_file());

        let state = stop(running);
        assert!(!state.lock().active);
    }

    #[test]
    fn test_sync_tick_writes_and_keeps_records() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, 100, 0.75);
        let timing = Timing {
            clear: SLOW,
            sync: Some(FAST),
        };
        let running = start(&settings, timing, &["p1"]);

        assert!(wait_until(|| dir.path().join("p1").is_file()));
        assert!(running.state.lock().table.contains("p1"));

        let state = stop(running);
        assert!(state.lock().table.is_empty());
    }

    #[test]
    fn test_disabled_sync_only_writes_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, 100, 0.75);
        let timing = Timing {
            clear: FAST,
            sync: None,
        };
        let running = start(&settings, timing, &["p1"]);

        // Several clear ticks pass below the limit without writing anything
        thread::sleep(Duration::from_millis(60));
        assert!(!dir.path().join("p1").exists());
        assert!(running.state.lock().table.contains("p1"));

        stop(running);
        assert!(dir.path().join("p1").is_file());
    }

    #[test]
    fn test_timing_from_settings() {
        let dir = TempDir::new().unwrap();
        let settings = SafeConfig::builder()
            .path(dir.path())
            .clear_interval(2)
            .disc_sync_interval(0)
            .build();

        let timing = Timing::from_settings(&settings);

        assert_eq!(timing.clear, Duration::from_secs(120));
        assert_eq!(timing.sync, None);
    }
}
