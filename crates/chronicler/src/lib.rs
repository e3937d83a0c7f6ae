//! Chronicler: the append-only on-disk log behind a Swamp (`spec.md` §3.4,
//! §4.4). Two formats coexist:
//!
//! - V2 (`writer`, `reader`, `compaction`, `format`): the current
//!   compressed, footer-indexed, compacting log.
//! - V1 (`v1`): a read-only legacy chunk-file surface used only to migrate
//!   an old Swamp's data into a fresh V2 file.

pub mod compaction;
pub mod error;
pub mod format;
pub mod reader;
pub mod v1;
pub mod writer;

pub use compaction::{calculate_fragmentation, compact_if_needed, Fragmentation};
pub use error::{Error, Result};
pub use reader::{LoadResult, Reader};
pub use writer::Writer;
