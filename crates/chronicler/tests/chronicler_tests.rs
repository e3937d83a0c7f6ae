//! End-to-end Chronicler V2 scenarios.

use hydraide_chronicler::format::Entry;
use hydraide_chronicler::{Reader, Writer};
use hydraide_core::Treasure;
use tempfile::tempdir;

fn string_treasure(key: &str, content: &str) -> Treasure {
    let mut t = Treasure::new(key);
    let id = t.start_guard(true, "test");
    t.set_string(id, content).unwrap();
    t.release_guard(id);
    t
}

/// Scenario 4: Chronicler V2 persistence.
#[test]
fn scenario_chronicler_persistence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("swamp.hyd");

    let t = string_treasure("persistent-key", "persistent-content");
    let guard = t.start_guard(true, "test");
    let bytes = t.to_bytes(guard).unwrap();

    let mut w = Writer::open(&path, "s/r/persistent", 1_700_000_000_000, 64 * 1024).unwrap();
    w.write_entry(Entry::insert("persistent-key", bytes)).unwrap();
    w.close().unwrap();

    let result = Reader::load(&path).unwrap();
    assert_eq!(result.live.len(), 1);
    assert!(result.live.contains_key("persistent-key"));
}

/// Scenario 5: update and delete via log.
#[test]
fn scenario_update_and_delete_via_log() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("swamp.hyd");

    let v1 = string_treasure("k", "v1");
    let guard1 = v1.start_guard(true, "test");
    let v1_bytes = v1.to_bytes(guard1).unwrap();

    let v2 = string_treasure("k", "v2");
    let guard2 = v2.start_guard(true, "test");
    let v2_bytes = v2.to_bytes(guard2).unwrap();

    let mut w = Writer::open(&path, "s/r/updel", 1_700_000_000_000, 64 * 1024).unwrap();
    w.write_entry(Entry::insert("k", v1_bytes)).unwrap();
    w.write_entry(Entry::update("k", v2_bytes)).unwrap();
    w.write_entry(Entry::delete("k")).unwrap();
    w.close().unwrap();

    let result = Reader::load(&path).unwrap();
    assert_eq!(result.live.len(), 0);
    assert!(!result.live.contains_key("k"));
}

/// Scenario 6: large dataset — compression and reload.
#[test]
fn scenario_large_dataset_compresses_and_reloads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("swamp.hyd");

    let mut w = Writer::open(&path, "s/r/large", 1_700_000_000_000, 256 * 1024).unwrap();
    let mut raw_value_bytes: u64 = 0;
    for i in 0..10_000 {
        let content = format!("content-{i}-with-extra-data-to-make-it-bigger");
        raw_value_bytes += content.len() as u64;
        let t = string_treasure(&format!("key-{i}"), &content);
        let guard = t.start_guard(true, "test");
        let bytes = t.to_bytes(guard).unwrap();
        w.write_entry(Entry::insert(format!("key-{i}"), bytes)).unwrap();
    }
    w.close().unwrap();

    let file_size = std::fs::metadata(&path).unwrap().len();
    assert!(
        file_size < raw_value_bytes,
        "file size {file_size} should be smaller than raw value bytes {raw_value_bytes}"
    );

    let result = Reader::load(&path).unwrap();
    assert_eq!(result.live.len(), 10_000);
}
