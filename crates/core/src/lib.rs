//! Name/Island hashing and the Treasure data model for HydrAIDE.
//!
//! This crate implements the two lowest-level components of the storage
//! engine: deterministic routing of a hierarchical [`Name`] to an Island
//! (component A), and the [`Treasure`] record type with its guard-based
//! concurrency control (component B). Everything above the Beacon index
//! and Chronicler log lives in sibling crates.

pub mod error;
mod limits;
mod name;
mod treasure;

pub use error::{Error, Result};
pub use limits::{
    BACKOFF_FACTOR, BACKOFF_INITIAL_MS, BACKOFF_MAX_ATTEMPTS, BACKOFF_MAX_MS,
    DEFAULT_FRAGMENTATION_THRESHOLD, DEFAULT_MAX_BLOCK_SIZE, HARD_MAX_MESSAGE_SIZE,
    KEEPALIVE_INTERVAL_SECS, MAX_NAME_SEGMENT_BYTES, TYPICAL_MAX_MESSAGE_SIZE,
};
pub use name::Name;
pub use treasure::{now, GuardId, Metadata, Mode, Timestamp, Treasure, TriBool, Value};
