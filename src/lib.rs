//! # HydrAIDE
//!
//! An embedded, hash-partitioned key-value storage engine. Data lives in
//! Swamps — named by a Sanctuary/Realm/Swamp triple, hashed deterministically
//! to an Island folder on disk — each backed by an in-memory Beacon index and
//! an append-only Chronicler log.
//!
//! # Quick start
//!
//! ```no_run
//! use hydraide::{Name, Swamp, SwampConfig, Treasure};
//!
//! fn main() -> hydraide::swamp::Result<()> {
//!     let config = SwampConfig::new("./data", 1000);
//!     let name = Name::new("app", "users", "profiles")?;
//!     let swamp = Swamp::open(name, config);
//!
//!     let mut treasure = Treasure::new("user:42");
//!     let guard = treasure.start_guard(true, "example");
//!     treasure.set_string(guard, "Alice")?;
//!     treasure.release_guard(guard);
//!     swamp.write(vec![treasure])?;
//!
//!     let read = swamp.read("user:42")?;
//!     assert!(read.is_some());
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! | Crate | Responsibility |
//! |-------|----------------|
//! | [`hydraide_core`] | Name hashing, Treasure value model, shared error taxonomy |
//! | [`hydraide_beacon`] | In-memory per-Swamp index (ordering, filtering, TTL sweep) |
//! | [`hydraide_chronicler`] | Append-only on-disk log (current and legacy formats) |
//! | [`hydraide_swamp`] | Swamp lifecycle: lazy load, write-through, idle eviction |
//! | [`hydraide_router`] | mTLS `tonic` channel management and name-based routing |
//!
//! Only the surface re-exported here is stable; the sub-crates may be
//! depended on directly but their internals are not guaranteed stable
//! independent of this facade.

pub use hydraide_core as core;
pub use hydraide_beacon as beacon;
pub use hydraide_chronicler as chronicler;
pub use hydraide_router as router;
pub use hydraide_swamp as swamp;

pub use hydraide_core::{Error, Name, Result, Treasure, Value};
pub use hydraide_swamp::{Swamp, SwampConfig};
