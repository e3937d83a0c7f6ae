//! End-to-end Swamp lifecycle scenarios, combining Beacon and Chronicler
//! behavior through the bound-together lifecycle surface.

use hydraide_core::{Name, Treasure};
use hydraide_swamp::{Swamp, SwampConfig};
use tempfile::tempdir;

fn string_treasure(key: &str, content: &str) -> Treasure {
    let mut t = Treasure::new(key);
    let id = t.start_guard(true, "test");
    t.set_string(id, content).unwrap();
    t.release_guard(id);
    t
}

fn expiring_treasure(key: &str, expired_at: i64) -> Treasure {
    let mut t = Treasure::new(key);
    let id = t.start_guard(true, "test");
    t.set_string(id, "v").unwrap();
    t.set_expiration_time(id, expired_at).unwrap();
    t.release_guard(id);
    t
}

#[test]
fn write_close_reopen_survives_process_restart() {
    let dir = tempdir().unwrap();
    let config = SwampConfig::new(dir.path(), 1000);
    let name = Name::new("sanctuary", "realm", "swamp-a").unwrap();

    {
        let swamp = Swamp::open(name.clone(), config.clone());
        swamp
            .write(vec![
                string_treasure("k1", "v1"),
                string_treasure("k2", "v2"),
            ])
            .unwrap();
        swamp.close().unwrap();
    }

    let swamp = Swamp::open(name, config);
    assert_eq!(swamp.count().unwrap(), 2);
    let reloaded = swamp.read("k1").unwrap().unwrap();
    assert_eq!(
        reloaded.value(),
        Some(&hydraide_core::Value::String("v1".to_string()))
    );
}

#[test]
fn delete_then_reopen_reflects_tombstone() {
    let dir = tempdir().unwrap();
    let config = SwampConfig::new(dir.path(), 1000);
    let name = Name::new("sanctuary", "realm", "swamp-b").unwrap();

    {
        let swamp = Swamp::open(name.clone(), config.clone());
        swamp.write(vec![string_treasure("k", "v1")]).unwrap();
        let mut deleted = string_treasure("k", "v1");
        let id = deleted.start_guard(true, "test");
        deleted.shadow_delete(id, "test").unwrap();
        deleted.release_guard(id);
        swamp.write(vec![deleted]).unwrap();
        swamp.close().unwrap();
    }

    let swamp = Swamp::open(name, config);
    let reloaded = swamp.read("k").unwrap().unwrap();
    assert!(reloaded.is_tombstone());
}

#[test]
fn shift_expired_appends_deletes_and_shrinks_count() {
    let dir = tempdir().unwrap();
    let config = SwampConfig::new(dir.path(), 1000);
    let name = Name::new("sanctuary", "realm", "swamp-c").unwrap();
    let swamp = Swamp::open(name, config);

    let now = hydraide_core::now();
    let mut treasures = Vec::new();
    for i in 0i64..5 {
        treasures.push(expiring_treasure(&format!("exp-{i}"), now - 1000 + i));
    }
    for i in 0..5 {
        treasures.push(expiring_treasure(&format!("live-{i}"), now + 3_600_000));
    }
    swamp.write(treasures).unwrap();
    assert_eq!(swamp.count().unwrap(), 10);

    // Swamp applies the ExpiredAt-ascending view on the caller's behalf.
    let shifted = swamp.shift_expired(5).unwrap();
    assert_eq!(shifted.len(), 5);
    assert_eq!(swamp.count().unwrap(), 5);
    assert!(shifted.iter().all(|t| t.get_key().starts_with("exp-")));

    let shifted_again = swamp.shift_expired(5).unwrap();
    assert_eq!(shifted_again.len(), 0);
    assert_eq!(swamp.count().unwrap(), 5);
}

#[test]
fn in_memory_swamp_has_no_file_but_is_queryable() {
    let dir = tempdir().unwrap();
    let config = SwampConfig::new(dir.path(), 1000).in_memory();
    let name = Name::new("sanctuary", "realm", "swamp-d").unwrap();
    let swamp = Swamp::open(name, config);

    swamp.write(vec![string_treasure("k", "v")]).unwrap();
    assert_eq!(swamp.count().unwrap(), 1);
    assert!(dir.path().read_dir().unwrap().next().is_none());
}
