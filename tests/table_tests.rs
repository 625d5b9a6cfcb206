//! Tests for the hot record table and the worker cycles
//!
//! Tests verify:
//! - Loading on first access and touching on every access
//! - Persist, evict and forget
//! - Eviction ranking (least recently used first, ties by identifier)
//! - Clear / sync / shutdown cycles and the completion signal

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pollsafe::codec;
use pollsafe::record::{Answer, PollRecord};
use pollsafe::table::RecordTable;
use pollsafe::worker::{self, Completion};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_table() -> (TempDir, RecordTable) {
    let temp_dir = TempDir::new().unwrap();
    let table = RecordTable::new(temp_dir.path());
    (temp_dir, table)
}

fn configure(table: &mut RecordTable, id: &str) {
    table.get_mut(id).unwrap().config = format!("config-{}", id).into_bytes();
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_table_is_empty() {
    let (_temp, table) = setup_temp_table();
    assert!(table.is_empty());
    assert_eq!(table.len(), 0);
    assert!(table.eviction_order().is_empty());
}

#[test]
fn test_get_mut_creates_empty_record() {
    let (_temp, mut table) = setup_temp_table();

    let record = table.get_mut("p1").unwrap();

    assert_eq!(*record, PollRecord::new());
    assert!(table.contains("p1"));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_get_mut_loads_from_disk() {
    let (temp, mut table) = setup_temp_table();
    let mut stored = PollRecord::new();
    stored.config = b"config".to_vec();
    stored.push_answer(Answer::new(vec![1], "a", "", "s"));
    codec::write_record(&temp.path().join("p1"), &stored).unwrap();

    let record = table.get_mut("p1").unwrap();

    assert_eq!(*record, stored);
}

#[test]
fn test_get_mut_touches_record() {
    let (_temp, mut table) = setup_temp_table();
    let first = table.get_mut("p1").unwrap().last_access;
    thread::sleep(Duration::from_millis(2));

    let second = table.get_mut("p1").unwrap().last_access;

    assert!(second > first);
}

#[test]
fn test_peek_does_not_load() {
    let (_temp, table) = setup_temp_table();
    assert!(table.peek("p1").is_none());
    assert!(!table.contains("p1"));
}

// =============================================================================
// Persist / Evict Tests
// =============================================================================

#[test]
fn test_persist_keeps_record_hot() {
    let (temp, mut table) = setup_temp_table();
    configure(&mut table, "p1");

    assert!(table.persist("p1").unwrap());

    assert!(table.contains("p1"));
    assert!(temp.path().join("p1").is_file());
}

#[test]
fn test_persist_unknown_id_writes_nothing() {
    let (_temp, table) = setup_temp_table();
    assert!(!table.persist("ghost").unwrap());
}

#[test]
fn test_evict_writes_and_drops() {
    let (temp, mut table) = setup_temp_table();
    configure(&mut table, "p1");

    assert!(table.evict("p1").unwrap());

    assert!(!table.contains("p1"));
    let record = codec::read_record(&temp.path().join("p1")).unwrap();
    assert_eq!(record.config, b"config-p1".to_vec());
}

#[test]
fn test_evict_drops_record_even_if_write_fails() {
    let temp_dir = TempDir::new().unwrap();
    let mut table = RecordTable::new(temp_dir.path().join("missing-dir"));
    table.get_mut("p1").unwrap().config = b"config".to_vec();

    assert!(table.evict("p1").is_err());
    assert!(!table.contains("p1"));
}

#[test]
fn test_forget_does_not_write() {
    let (temp, mut table) = setup_temp_table();
    configure(&mut table, "p1");

    assert!(table.forget("p1").is_some());

    assert!(!table.contains("p1"));
    assert!(!temp.path().join("p1").exists());
}

#[test]
fn test_persist_all_skips_unconfigured() {
    let (_temp, mut table) = setup_temp_table();
    configure(&mut table, "p1");
    configure(&mut table, "p2");
    table.get_mut("empty").unwrap();

    assert_eq!(table.persist_all(), 2);
    assert_eq!(table.len(), 3);
}

#[test]
fn test_deleted_ids() {
    let (_temp, mut table) = setup_temp_table();
    configure(&mut table, "alive");
    configure(&mut table, "gone");
    table.get_mut("gone").unwrap().mark_deleted();

    assert_eq!(table.deleted_ids(), vec!["gone".to_string()]);
}

// =============================================================================
// Eviction Order Tests
// =============================================================================

#[test]
fn test_eviction_order_oldest_first() {
    let (_temp, mut table) = setup_temp_table();
    for id in ["c", "a", "b"] {
        table.get_mut(id).unwrap();
        thread::sleep(Duration::from_millis(2));
    }

    assert_eq!(table.eviction_order(), vec!["c", "a", "b"]);
}

#[test]
fn test_eviction_order_ties_broken_by_id() {
    let (_temp, mut table) = setup_temp_table();
    let stamp = Instant::now();
    for id in ["b", "c", "a"] {
        table.get_mut(id).unwrap().last_access = stamp;
    }

    assert_eq!(table.eviction_order(), vec!["a", "b", "c"]);
}

// =============================================================================
// Worker Cycle Tests
// =============================================================================

#[test]
fn test_clear_cycle_noop_at_or_below_maximum() {
    let (_temp, mut table) = setup_temp_table();
    configure(&mut table, "p1");
    configure(&mut table, "p2");

    assert!(worker::clear_cycle(&mut table, 2, 0).is_empty());
    assert_eq!(table.len(), 2);
}

#[test]
fn test_clear_cycle_reaches_target() {
    let (temp, mut table) = setup_temp_table();
    for i in 0..10 {
        configure(&mut table, &format!("p{}", i));
        thread::sleep(Duration::from_millis(1));
    }

    let evicted = worker::clear_cycle(&mut table, 8, 6);

    assert_eq!(evicted, vec!["p0", "p1", "p2", "p3"]);
    assert_eq!(table.len(), 6);
    for id in &evicted {
        assert!(temp.path().join(id).is_file());
    }
}

#[test]
fn test_sync_cycle_keeps_records() {
    let (temp, mut table) = setup_temp_table();
    configure(&mut table, "p1");
    configure(&mut table, "p2");

    assert_eq!(worker::sync_cycle(&table), 2);

    assert_eq!(table.len(), 2);
    assert!(temp.path().join("p1").is_file());
    assert!(temp.path().join("p2").is_file());
}

#[test]
fn test_sync_cycle_continues_after_failure() {
    let temp_dir = TempDir::new().unwrap();
    let mut table = RecordTable::new(temp_dir.path());
    configure(&mut table, "p1");
    configure(&mut table, "blocked");
    // A directory in the way makes writing this record fail
    std::fs::create_dir(temp_dir.path().join("blocked")).unwrap();

    assert_eq!(worker::sync_cycle(&table), 1);
    assert!(temp_dir.path().join("p1").is_file());
}

#[test]
fn test_shutdown_flush_empties_table() {
    let (temp, mut table) = setup_temp_table();
    configure(&mut table, "p1");

    assert_eq!(worker::shutdown_flush(&mut table), 1);

    assert!(table.is_empty());
    assert!(temp.path().join("p1").is_file());
}

#[test]
fn test_completion_wakes_all_waiters() {
    let completion = Arc::new(Completion::new());

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let completion = Arc::clone(&completion);
            thread::spawn(move || completion.wait())
        })
        .collect();
    thread::sleep(Duration::from_millis(10));
    assert!(!completion.is_done());

    completion.signal();
    for waiter in waiters {
        waiter.join().unwrap();
    }
    assert!(completion.is_done());

    // Waiting after the signal returns immediately
    completion.wait();
}
