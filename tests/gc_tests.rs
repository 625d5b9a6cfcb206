//! Tests for garbage collection
//!
//! Tests verify:
//! - Soft-deleted polls lose their file and come back empty
//! - Deleted and never-configured files are removed even when not hot
//! - Live polls are left alone
//! - Undecodable files are skipped without stopping the pass

use std::fs;

use pollsafe::codec;
use pollsafe::config::SafeConfig;
use pollsafe::record::{Answer, PollRecord};
use pollsafe::{DataSafe, FileSafe, GcReport};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_safe() -> (TempDir, FileSafe) {
    let temp_dir = TempDir::new().unwrap();
    let config = SafeConfig::builder()
        .path(temp_dir.path())
        .maximum_memory(100)
        .clear_interval(60)
        .disc_sync_interval(0)
        .build();
    let safe = FileSafe::open(config).unwrap();
    (temp_dir, safe)
}

fn configured_record() -> PollRecord {
    let mut record = PollRecord::new();
    record.config = b"config".to_vec();
    record.push_answer(Answer::new(vec![0], "a", "", "s"));
    record
}

// =============================================================================
// Soft Delete Tests
// =============================================================================

#[test]
fn test_mark_deleted_then_gc_removes_file() {
    let (temp, safe) = setup_temp_safe();
    safe.save_config("p1", b"config").unwrap();
    safe.save_creator("p1", "owner").unwrap();
    safe.save_result("p1", Answer::new(vec![1], "a", "", "s")).unwrap();
    safe.sync_cycle().unwrap();
    assert!(temp.path().join("p1").is_file());

    safe.mark_deleted("p1").unwrap();
    let report = safe.run_gc().unwrap();

    assert_eq!(report.dropped_from_memory, 1);
    assert_eq!(report.removed, 1);
    assert!(!temp.path().join("p1").exists());
    assert!(!safe.is_hot("p1").unwrap());
}

#[test]
fn test_access_after_gc_recreates_empty_record() {
    let (temp, safe) = setup_temp_safe();
    safe.save_config("p1", b"config").unwrap();
    safe.save_result("p1", Answer::new(vec![1], "a", "", "s")).unwrap();
    safe.mark_deleted("p1").unwrap();
    safe.run_gc().unwrap();

    assert!(safe.get_config("p1").unwrap().is_empty());
    assert!(safe.get_results("p1").unwrap().is_empty());
    assert_eq!(safe.get_creator("p1").unwrap(), "");

    safe.save_config("p1", b"fresh").unwrap();
    safe.sync_cycle().unwrap();
    let record = codec::read_record(&temp.path().join("p1")).unwrap();
    assert!(!record.deleted);
    assert!(record.rows.is_empty());
}

#[test]
fn test_deleted_poll_never_written_before_gc() {
    let (temp, safe) = setup_temp_safe();
    safe.save_config("p1", b"config").unwrap();
    safe.mark_deleted("p1").unwrap();

    let report = safe.run_gc().unwrap();

    assert_eq!(report.removed, 1);
    assert!(!temp.path().join("p1").exists());
}

// =============================================================================
// Disk Scan Tests
// =============================================================================

#[test]
fn test_gc_removes_cold_deleted_and_unconfigured_files() {
    let (temp, safe) = setup_temp_safe();
    let mut deleted = configured_record();
    deleted.mark_deleted();
    codec::write_record(&temp.path().join("deleted"), &deleted).unwrap();
    fs::write(
        temp.path().join("unconfigured"),
        codec::encode(&PollRecord::new()).unwrap(),
    )
    .unwrap();
    codec::write_record(&temp.path().join("alive"), &configured_record()).unwrap();

    let report = safe.run_gc().unwrap();

    assert_eq!(
        report,
        GcReport {
            dropped_from_memory: 0,
            removed: 2,
            skipped: 0,
        }
    );
    assert!(!temp.path().join("deleted").exists());
    assert!(!temp.path().join("unconfigured").exists());
    assert!(temp.path().join("alive").is_file());
}

#[test]
fn test_gc_leaves_hot_polls_alone() {
    let (temp, safe) = setup_temp_safe();
    safe.save_config("hot", b"config").unwrap();
    safe.sync_cycle().unwrap();

    let report = safe.run_gc().unwrap();

    assert_eq!(report.removed, 0);
    assert!(temp.path().join("hot").is_file());
    assert_eq!(safe.get_config("hot").unwrap(), b"config".to_vec());
}

#[test]
fn test_gc_skips_undecodable_files() {
    let (temp, safe) = setup_temp_safe();
    fs::write(temp.path().join("garbage"), b"not a record").unwrap();
    let mut deleted = configured_record();
    deleted.mark_deleted();
    codec::write_record(&temp.path().join("deleted"), &deleted).unwrap();

    let report = safe.run_gc().unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.removed, 1);
    assert!(temp.path().join("garbage").is_file());
    assert!(!temp.path().join("deleted").exists());
}

#[test]
fn test_gc_ignores_directories() {
    let (temp, safe) = setup_temp_safe();
    fs::create_dir(temp.path().join("subdir")).unwrap();

    let report = safe.run_gc().unwrap();

    assert_eq!(report, GcReport::default());
    assert!(temp.path().join("subdir").is_dir());
}

#[test]
fn test_gc_on_empty_directory() {
    let (_temp, safe) = setup_temp_safe();
    assert_eq!(safe.run_gc().unwrap(), GcReport::default());
}
