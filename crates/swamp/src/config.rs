//! Swamp configuration: an injected struct rather than a config file, since
//! each Swamp is constructed by its owning process and has no independent
//! lifetime worth persisting settings for (`spec.md` §4.6).

use std::path::PathBuf;
use std::time::Duration;

/// Settings a Swamp is opened with. `data_root` and `all_islands` locate the
/// Swamp's on-disk position (`spec.md` §3.1, §6); the remaining fields are
/// the four knobs `spec.md` §4.6 names directly.
#[derive(Debug, Clone)]
pub struct SwampConfig {
    /// Root directory holding every island's folder tree.
    pub data_root: PathBuf,
    /// Total number of islands, used to compute this Swamp's island ID.
    pub all_islands: u64,
    /// How long a Swamp may sit idle before its Chronicler is closed and its
    /// Beacon dropped.
    pub close_after_idle: Duration,
    /// Target size for a sealed Chronicler block (also used to bound V1
    /// chunk files during migration).
    pub max_file_size: usize,
    /// Batching window between flushes. `Duration::ZERO` means every write
    /// is flushed eagerly.
    pub write_interval: Duration,
    /// When set, the Swamp skips the Chronicler entirely: writes only ever
    /// reach the Beacon and nothing survives a process restart.
    pub is_in_memory: bool,
}

impl Default for SwampConfig {
    fn default() -> Self {
        SwampConfig {
            data_root: PathBuf::from("."),
            all_islands: 1000,
            close_after_idle: Duration::from_secs(5 * 60),
            max_file_size: 8 * 1024 * 1024,
            write_interval: Duration::ZERO,
            is_in_memory: false,
        }
    }
}

impl SwampConfig {
    pub fn new(data_root: impl Into<PathBuf>, all_islands: u64) -> Self {
        SwampConfig {
            data_root: data_root.into(),
            all_islands,
            ..Default::default()
        }
    }

    pub fn with_close_after_idle(mut self, d: Duration) -> Self {
        self.close_after_idle = d;
        self
    }

    pub fn with_max_file_size(mut self, n: usize) -> Self {
        self.max_file_size = n;
        self
    }

    pub fn with_write_interval(mut self, d: Duration) -> Self {
        self.write_interval = d;
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.is_in_memory = true;
        self
    }
}
