//! Error types for Name/Island hashing and the Treasure data model.
//!
//! These are the two error kinds §7 of the specification classifies as
//! "programming error, surface to caller": `InvalidName` and
//! `GuardViolation`/`InvalidValueVariant` are never retried by the lifecycle.

use thiserror::Error;

/// Result type alias used throughout `hydraide-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by Name validation, Treasure construction, and guard checks.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// A Name segment was empty, contained a path separator, or exceeded
    /// the 1 KiB per-segment limit.
    #[error("invalid name segment {segment:?}: {reason}")]
    InvalidName {
        /// The offending segment value (truncated for display if oversized).
        segment: String,
        /// Human-readable reason.
        reason: &'static str,
    },

    /// A mutation was attempted without presenting a valid, currently-held
    /// guard id for the Treasure.
    #[error("guard violation: {0}")]
    GuardViolation(&'static str),

    /// More than one (or zero) value variants were set on a Treasure that
    /// is not a tombstone.
    #[error("invalid value variant: {0}")]
    InvalidValueVariant(&'static str),

    /// `Treasure::to_bytes` failed to encode the record.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// `Treasure::from_bytes` failed to decode a byte stream.
    #[error("decode error: {0}")]
    DecodeError(String),
}

impl Error {
    /// All error kinds in this crate are programming errors per spec §7:
    /// they are surfaced to the caller and never retried by the lifecycle.
    pub fn is_programming_error(&self) -> bool {
        true
    }
}
