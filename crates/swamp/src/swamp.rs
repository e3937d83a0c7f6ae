//! The Swamp lifecycle (`spec.md` §4.6): binds a Beacon and a Chronicler
//! writer behind one per-Swamp read-write lock, with lazy load, lazy
//! writer construction, and idle eviction.

use std::path::PathBuf;
use std::time::Instant;

use hydraide_beacon::{Beacon, OrderPosition};
use hydraide_chronicler::format::Entry;
use hydraide_chronicler::{compact_if_needed, Reader, Writer};
use hydraide_core::{now, Name, Treasure, DEFAULT_FRAGMENTATION_THRESHOLD};
use parking_lot::{RwLock, RwLockWriteGuard};

use crate::config::SwampConfig;
use crate::error::{Error, Result};

struct SwampState {
    beacon: Option<Beacon>,
    writer: Option<Writer>,
    last_activity: Instant,
    destroyed: bool,
}

impl SwampState {
    fn fresh() -> Self {
        SwampState {
            beacon: None,
            writer: None,
            last_activity: Instant::now(),
            destroyed: false,
        }
    }
}

/// A single Swamp: the unit of storage this engine hands out to callers.
/// Owns its Beacon exclusively (never shared across Swamps) and its
/// Chronicler writer handle for the lifetime it stays loaded.
pub struct Swamp {
    name: Name,
    island_id: u64,
    path: PathBuf,
    config: SwampConfig,
    state: RwLock<SwampState>,
}

impl Swamp {
    /// Opens (or prepares to lazily open) the Swamp identified by `name`.
    /// Does not touch the filesystem until the first operation — a Swamp
    /// that is only ever constructed and dropped leaves nothing behind.
    pub fn open(name: Name, config: SwampConfig) -> Self {
        let island_id = name.island_id(config.all_islands);
        let path = config.data_root.join(name.folder_path(island_id));
        Swamp {
            name,
            island_id,
            path,
            config,
            state: RwLock::new(SwampState::fresh()),
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn island_id(&self) -> u64 {
        self.island_id
    }

    /// Ensures the Beacon (and, for a persisted Swamp, the on-disk file) is
    /// loaded, evicting a stale (idle-expired) load first. Always called
    /// under the write lock: loading mutates `Option<Beacon>`/`Option<Writer>`,
    /// so there is no way to do this under a shared read lock.
    fn ensure_ready(&self, state: &mut SwampState) -> Result<()> {
        if state.destroyed {
            return Err(Error::Destroyed);
        }
        if state.beacon.is_some() && state.last_activity.elapsed() >= self.config.close_after_idle
        {
            self.evict(state)?;
        }
        if state.beacon.is_none() {
            let mut beacon = Beacon::new();
            // Beacon::add requires an initialized Beacon, so this must be
            // set before either load path below touches it, not after.
            beacon.set_initialized(true);
            if !self.config.is_in_memory && self.path.exists() {
                let loaded = Reader::load(&self.path)?;
                let count = loaded.live.len();
                for (key, data) in loaded.live {
                    let treasure = Treasure::from_bytes(0, &data, Some(key))?;
                    beacon.add(treasure)?;
                }
                tracing::info!(
                    swamp = %self.name.canonical(),
                    island = self.island_id,
                    treasures = count,
                    "replayed swamp from chronicler"
                );
            } else if !self.config.is_in_memory && self.v1_dir().is_dir() {
                self.migrate_from_v1(state, &mut beacon)?;
            }
            state.beacon = Some(beacon);
        }
        Ok(())
    }

    /// The legacy V1 chunk folder for this Swamp, per `spec.md` §3.5, §6.
    fn v1_dir(&self) -> PathBuf {
        self.config.data_root.join(self.name.v1_folder_path(self.island_id))
    }

    /// One-shot migration (`spec.md` §3.5, §4.5): folds the V1 chunk
    /// files into `beacon`, then immediately rewrites them as a fresh V2
    /// file so every subsequent open takes the V2 path. The V1 folder is
    /// left in place until the V2 file is fsynced and closed, so a crash
    /// mid-migration just repeats the migration on the next open.
    fn migrate_from_v1(&self, state: &mut SwampState, beacon: &mut Beacon) -> Result<()> {
        let v1_dir = self.v1_dir();
        let entries = hydraide_chronicler::v1::load(&v1_dir)?;
        let count = entries.len();
        let mut writer = Writer::open(
            &self.path,
            self.name.canonical(),
            now(),
            self.config.max_file_size,
        )?;
        for (key, data) in &entries {
            let treasure = Treasure::from_bytes(0, data, Some(key.clone()))?;
            beacon.add(treasure)?;
            writer.write_entry(Entry::update(key.clone(), data.clone()))?;
        }
        writer.close()?;
        std::fs::remove_dir_all(&v1_dir).map_err(Error::from_io)?;
        state.writer = None;
        tracing::info!(
            swamp = %self.name.canonical(),
            island = self.island_id,
            treasures = count,
            "migrated swamp from v1 chunk format"
        );
        Ok(())
    }

    /// Closes the writer (if open) and drops the Beacon. Does not run
    /// fragmentation-triggered compaction here — see `force_compaction` and
    /// the note in `DESIGN.md` on why automatic close-time compaction is
    /// not wired in.
    fn evict(&self, state: &mut SwampState) -> Result<()> {
        if let Some(mut writer) = state.writer.take() {
            writer.close()?;
        }
        if state.beacon.is_some() {
            tracing::debug!(swamp = %self.name.canonical(), "evicting idle swamp");
        }
        state.beacon = None;
        Ok(())
    }

    fn ready_write(&self) -> Result<RwLockWriteGuard<'_, SwampState>> {
        let mut state = self.state.write();
        self.ensure_ready(&mut state)?;
        state.last_activity = Instant::now();
        Ok(state)
    }

    /// Encodes and appends `treasures` to the Chronicler (unless
    /// in-memory) and adds each to the Beacon, in order. All-or-nothing
    /// from the caller's perspective: a mid-batch Chronicler failure stops
    /// the loop — Treasures already applied remain both in the Beacon and
    /// on disk, while the rest are never applied anywhere.
    pub fn write(&self, treasures: Vec<Treasure>) -> Result<()> {
        let mut state = self.ready_write()?;
        for treasure in treasures {
            if !self.config.is_in_memory {
                if state.writer.is_none() {
                    let writer = Writer::open(
                        &self.path,
                        self.name.canonical(),
                        now(),
                        self.config.max_file_size,
                    )?;
                    state.writer = Some(writer);
                }
                let guard = treasure.start_guard(true, "swamp-write");
                let bytes = treasure.to_bytes(guard)?;
                let key = treasure.get_key().to_string();
                treasure.release_guard(guard);
                // A shadow-deleted Treasure is still written as a normal
                // entry — its tombstone flag and DeletedAt/DeletedBy live
                // inside the encoded body. Entry::delete is the Chronicler's
                // own full-removal op (see shift_expired below), which would
                // erase the key on replay instead of preserving the
                // tombstone.
                let entry = Entry::update(key, bytes);
                let writer = state.writer.as_mut().expect("just constructed above");
                writer.write_entry(entry)?;
                if self.config.write_interval.is_zero() {
                    writer.sync()?;
                }
            }
            let beacon = state.beacon.as_mut().expect("ensure_ready populates beacon");
            beacon.add(treasure)?;
        }
        Ok(())
    }

    /// Reads one Treasure by key, returning an owned clone so the caller's
    /// handle does not outlive the Beacon's read-lock critical section.
    pub fn read(&self, key: &str) -> Result<Option<Treasure>> {
        let guard = self.ready_write()?;
        let state = RwLockWriteGuard::downgrade(guard);
        let beacon = state.beacon.as_ref().expect("ensure_ready populates beacon");
        match beacon.get(key)? {
            Some(t) => {
                let guard_id = t.start_guard(true, "swamp-read");
                let cloned = t.clone_content(guard_id)?;
                t.release_guard(guard_id);
                Ok(Some(cloned))
            }
            None => Ok(None),
        }
    }

    /// Reads a page of Treasures from the Beacon's current ordered view.
    /// Takes the write lock (not just read) because the ordered view may
    /// need a lazy rebuild on the Beacon itself.
    pub fn read_many(&self, position: OrderPosition) -> Result<Vec<Treasure>> {
        let mut state = self.ready_write()?;
        state
            .beacon
            .as_mut()
            .expect("ensure_ready populates beacon")
            .get_many_from_order_position(position)
            .map_err(Error::from)
    }

    pub fn count(&self) -> Result<usize> {
        let guard = self.ready_write()?;
        let state = RwLockWriteGuard::downgrade(guard);
        Ok(state
            .beacon
            .as_ref()
            .expect("ensure_ready populates beacon")
            .count())
    }

    /// Shifts up to `n` expired Treasures out of the Beacon, appending a
    /// DELETE entry to the Chronicler for each.
    pub fn shift_expired(&self, n: usize) -> Result<Vec<Treasure>> {
        let mut state = self.ready_write()?;
        let beacon = state.beacon.as_mut().expect("ensure_ready populates beacon");
        // `Beacon::shift_expired` requires an active ExpiredAt sort; the
        // Swamp never exposes the Beacon's sort controls directly, so it
        // applies the ascending view itself when none is active yet,
        // preserving whichever ExpiredAt direction a caller already chose.
        if !beacon.is_ordered_by_expiry() {
            beacon.sort_by_expiration_time_asc()?;
        }
        let expired = beacon.shift_expired(n, now())?;

        if !self.config.is_in_memory && !expired.is_empty() {
            if state.writer.is_none() {
                let writer = Writer::open(
                    &self.path,
                    self.name.canonical(),
                    now(),
                    self.config.max_file_size,
                )?;
                state.writer = Some(writer);
            }
            let writer = state.writer.as_mut().expect("just constructed above");
            for t in &expired {
                writer.write_entry(Entry::delete(t.get_key().to_string()))?;
            }
            if self.config.write_interval.is_zero() {
                writer.sync()?;
            }
        }
        Ok(expired)
    }

    /// Flushes the Chronicler writer and evicts the Beacon, but leaves the
    /// on-disk file intact — the next operation reopens both transparently.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.destroyed {
            return Ok(());
        }
        self.evict(&mut state)
    }

    /// Unconditionally compacts the on-disk file regardless of its current
    /// fragmentation ratio (`spec.md` §4.4's "explicit force_compaction"
    /// trigger). A no-op for an in-memory Swamp or one with no file yet.
    pub fn force_compaction(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.destroyed {
            return Err(Error::Destroyed);
        }
        if let Some(mut writer) = state.writer.take() {
            writer.close()?;
        }
        if !self.config.is_in_memory && self.path.exists() {
            let outcome = compact_if_needed(
                &self.path,
                DEFAULT_FRAGMENTATION_THRESHOLD,
                true,
                now(),
                self.config.max_file_size,
            )?;
            if let Some(frag) = outcome {
                tracing::info!(
                    swamp = %self.name.canonical(),
                    live_entries = frag.live_entries,
                    total_entries = frag.total_entries,
                    ratio = frag.ratio,
                    "compacted swamp"
                );
            }
        }
        Ok(())
    }

    /// Removes the Swamp's file (and, if present, its V1 chunk folder) from
    /// disk. The Swamp instance itself becomes permanently unusable.
    pub fn destroy(&self) -> Result<()> {
        let mut state = self.state.write();
        if let Some(mut writer) = state.writer.take() {
            writer.close()?;
        }
        state.beacon = None;
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(Error::from_io)?;
        }
        let v1_dir = self.v1_dir();
        if v1_dir.exists() {
            std::fs::remove_dir_all(&v1_dir).map_err(Error::from_io)?;
        }
        state.destroyed = true;
        tracing::warn!(swamp = %self.name.canonical(), "destroyed swamp");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydraide_core::Treasure;
    use std::time::Duration;
    use tempfile::tempdir;

    fn string_treasure(key: &str, content: &str) -> Treasure {
        let mut t = Treasure::new(key);
        let id = t.start_guard(true, "test");
        t.set_string(id, content).unwrap();
        t.release_guard(id);
        t
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let config = SwampConfig::new(dir.path(), 100);
        let name = Name::new("s", "r", "w1").unwrap();
        let swamp = Swamp::open(name, config);

        swamp
            .write(vec![string_treasure("k1", "hello")])
            .unwrap();
        assert_eq!(swamp.count().unwrap(), 1);

        let t = swamp.read("k1").unwrap().unwrap();
        assert_eq!(t.get_key(), "k1");
    }

    #[test]
    fn close_then_reopen_replays_from_disk() {
        let dir = tempdir().unwrap();
        let config = SwampConfig::new(dir.path(), 100);
        let name = Name::new("s", "r", "w2").unwrap();
        let swamp = Swamp::open(name.clone(), config.clone());
        swamp
            .write(vec![string_treasure("persistent-key", "persistent-content")])
            .unwrap();
        swamp.close().unwrap();

        let reopened = Swamp::open(name, config);
        assert_eq!(reopened.count().unwrap(), 1);
        assert!(reopened.read("persistent-key").unwrap().is_some());
    }

    #[test]
    fn force_compaction_preserves_latest_value_and_drops_tombstones() {
        let dir = tempdir().unwrap();
        let config = SwampConfig::new(dir.path(), 100);
        let name = Name::new("s", "r", "w-compact").unwrap();
        let swamp = Swamp::open(name.clone(), config.clone());

        swamp.write(vec![string_treasure("k", "v1")]).unwrap();
        swamp.write(vec![string_treasure("k", "v2")]).unwrap();

        let mut gone = string_treasure("gone", "v");
        let id = gone.start_guard(true, "test");
        gone.shadow_delete(id, "test").unwrap();
        gone.release_guard(id);
        swamp.write(vec![gone]).unwrap();

        swamp.force_compaction().unwrap();

        let reopened = Swamp::open(name, config);
        assert_eq!(reopened.count().unwrap(), 1);
        let k = reopened.read("k").unwrap().unwrap();
        assert_eq!(
            k.value(),
            Some(&hydraide_core::Value::String("v2".to_string()))
        );
        assert!(reopened.read("gone").unwrap().is_none());
    }

    #[test]
    fn in_memory_swamp_never_touches_disk() {
        let dir = tempdir().unwrap();
        let config = SwampConfig::new(dir.path(), 100).in_memory();
        let name = Name::new("s", "r", "w3").unwrap();
        let swamp = Swamp::open(name, config);
        swamp.write(vec![string_treasure("k", "v")]).unwrap();
        assert_eq!(swamp.count().unwrap(), 1);
        assert!(!swamp.path.exists());
    }

    #[test]
    fn destroy_removes_file_and_rejects_further_operations() {
        let dir = tempdir().unwrap();
        let config = SwampConfig::new(dir.path(), 100);
        let name = Name::new("s", "r", "w4").unwrap();
        let swamp = Swamp::open(name, config);
        swamp.write(vec![string_treasure("k", "v")]).unwrap();
        swamp.destroy().unwrap();
        assert!(!swamp.path.exists());
        assert!(matches!(swamp.read("k"), Err(Error::Destroyed)));
    }

    #[test]
    fn opening_with_only_v1_chunks_migrates_to_v2_and_removes_chunk_folder() {
        use hydraide_chronicler::format::Entry;
        use std::io::Write as _;

        let dir = tempdir().unwrap();
        let config = SwampConfig::new(dir.path(), 100);
        let name = Name::new("s", "r", "legacy").unwrap();
        let island_id = name.island_id(config.all_islands);
        let v1_dir = config.data_root.join(name.v1_folder_path(island_id));
        std::fs::create_dir_all(&v1_dir).unwrap();

        let t1 = string_treasure("k1", "v1");
        let guard = t1.start_guard(true, "test");
        let bytes1 = t1.to_bytes(guard).unwrap();
        t1.release_guard(guard);

        let mut chunk = std::fs::File::create(v1_dir.join("chunk-000001.hyd1")).unwrap();
        let mut buf = Vec::new();
        Entry::insert("k1", bytes1).write_to(&mut buf).unwrap();
        chunk.write_all(&buf).unwrap();
        drop(chunk);

        let swamp = Swamp::open(name.clone(), config.clone());
        assert_eq!(swamp.count().unwrap(), 1);
        assert!(swamp.read("k1").unwrap().is_some());
        assert!(swamp.path.exists(), "migration should produce a V2 file");
        assert!(!v1_dir.exists(), "V1 chunk folder should be removed after migration");

        // A fresh Swamp handle now loads straight from the V2 file.
        let reopened = Swamp::open(name, config);
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn idle_eviction_reloads_transparently() {
        let dir = tempdir().unwrap();
        let config = SwampConfig::new(dir.path(), 100)
            .with_close_after_idle(Duration::from_millis(1));
        let name = Name::new("s", "r", "w5").unwrap();
        let swamp = Swamp::open(name, config);
        swamp.write(vec![string_treasure("k", "v")]).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        // Next operation silently evicts and reloads from disk.
        assert_eq!(swamp.count().unwrap(), 1);
    }
}
