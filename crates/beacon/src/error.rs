//! Errors raised by the Beacon (`spec.md` §4.3).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// An operation was issued before `set_initialized(true)`.
    #[error("beacon not initialized")]
    NotInitialized,

    /// `get`/`delete`/similar addressed a key absent from the primary index.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A `sort_by_value_<T>` call found zero Treasures whose value variant
    /// matched `T`.
    #[error("no treasures match the requested value type for sorting")]
    SortTypeMismatch,

    /// `shift_expired` was called while the ordered view is not sorted by
    /// `ExpiredAt`.
    #[error("beacon is not sorted by expiration time")]
    NotSortedByExpiry,
}
