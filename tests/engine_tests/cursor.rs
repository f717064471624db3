//! Tests for merged engine cursors
//!
//! These tests verify:
//! - Ascending key order across memtable and SSTables
//! - Newest version wins, tombstones hide older versions
//! - Keys-only scans skip value reads

use atlasds::config::{EngineConfig, WalSyncStrategy};
use atlasds::engine::Engine;
use tempfile::TempDir;

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = EngineConfig::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryNEntries { count: 100 })
        .memtable_size_limit(1024 * 1024)
        .build();
    (temp_dir, Engine::open(config).unwrap())
}

fn scan(engine: &Engine) -> Vec<(Vec<u8>, Vec<u8>)> {
    engine
        .cursor(true)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn test_cursor_empty_engine() {
    let (_temp, engine) = setup_temp_engine();

    assert!(scan(&engine).is_empty());
}

#[test]
fn test_cursor_sorted_across_layers() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"c", b"3").unwrap();
    engine.put(b"a", b"1").unwrap();
    engine.flush().unwrap();
    engine.put(b"d", b"4").unwrap();
    engine.flush().unwrap();
    engine.put(b"b", b"2").unwrap();

    let keys: Vec<Vec<u8>> = scan(&engine).into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
}

#[test]
fn test_cursor_newest_version_wins() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"v1").unwrap();
    engine.flush().unwrap();
    engine.put(b"key", b"v2").unwrap();
    engine.flush().unwrap();
    engine.put(b"key", b"v3").unwrap();

    assert_eq!(scan(&engine), vec![(b"key".to_vec(), b"v3".to_vec())]);

    engine.flush().unwrap();
    assert_eq!(scan(&engine), vec![(b"key".to_vec(), b"v3".to_vec())]);
}

#[test]
fn test_cursor_skips_deleted_keys() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();
    engine.flush().unwrap();
    engine.delete(b"a").unwrap();
    engine.delete(b"never-written").unwrap();

    assert_eq!(scan(&engine), vec![(b"b".to_vec(), b"2".to_vec())]);

    // Tombstone now on disk
    engine.flush().unwrap();
    assert_eq!(scan(&engine), vec![(b"b".to_vec(), b"2".to_vec())]);
}

#[test]
fn test_cursor_keys_only_returns_empty_values() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"a", b"payload").unwrap();
    engine.flush().unwrap();

    let pairs: Vec<_> = engine
        .cursor(false)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(pairs, vec![(b"a".to_vec(), Vec::new())]);
}

#[test]
fn test_cursor_is_a_snapshot() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"a", b"1").unwrap();
    let cursor = engine.cursor(true).unwrap();
    engine.put(b"b", b"2").unwrap();

    let pairs: Vec<_> = cursor.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(pairs, vec![(b"a".to_vec(), b"1".to_vec())]);
}

#[test]
fn test_cursor_many_tables() {
    let (_temp, engine) = setup_temp_engine();

    for round in 0..5 {
        for i in 0..20 {
            let key = format!("key{:03}", i * 5 + round);
            engine.put(key.as_bytes(), b"v").unwrap();
        }
        engine.flush().unwrap();
    }
    assert_eq!(engine.sstable_count(), 5);

    let keys: Vec<String> = scan(&engine)
        .into_iter()
        .map(|(k, _)| String::from_utf8(k).unwrap())
        .collect();
    let expected: Vec<String> = (0..100).map(|i| format!("key{:03}", i)).collect();
    assert_eq!(keys, expected);
}
