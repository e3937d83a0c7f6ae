//! The in-memory per-Swamp index for HydrAIDE.
//!
//! A [`Beacon`] holds the live contents of exactly one Swamp: a primary
//! key→Treasure index plus an optional ordered view over one sort
//! dimension at a time. It never persists anything itself — that is the
//! Chronicler's job, one layer up.

mod beacon;
pub mod error;
mod order;

pub use beacon::Beacon;
pub use error::{Error, Result};
pub use order::{Direction, OrderPosition, SortDimension};

pub use rustc_hash::FxHashMap;
