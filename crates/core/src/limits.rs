//! System-wide constants named by the specification.
//!
//! These are the defaults an embedder may override through its injected
//! configuration struct (`spec.md` §6); the values here are the spec's
//! documented defaults, not hard limits.

/// Default target size, in bytes, for a sealed Chronicler V2 block before
/// compression (`spec.md` §3.4, §4.4 `maxBlockSize`).
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 64 * 1024;

/// Default fragmentation ratio above which the Chronicler triggers
/// compaction at close time (`spec.md` §4.4).
pub const DEFAULT_FRAGMENTATION_THRESHOLD: f64 = 0.5;

/// Maximum size, in bytes, of a single Name segment (`spec.md` §4.1).
pub const MAX_NAME_SEGMENT_BYTES: usize = 1024;

/// Router/Client keep-alive ping interval (`spec.md` §4.7).
pub const KEEPALIVE_INTERVAL_SECS: u64 = 60;

/// Router/Client retry backoff: initial delay (`spec.md` §4.7).
pub const BACKOFF_INITIAL_MS: u64 = 500;

/// Router/Client retry backoff: maximum delay (`spec.md` §4.7).
pub const BACKOFF_MAX_MS: u64 = 10_000;

/// Router/Client retry backoff: multiplicative factor (`spec.md` §4.7).
pub const BACKOFF_FACTOR: f64 = 1.5;

/// Router/Client retry backoff: maximum attempts (`spec.md` §4.7).
pub const BACKOFF_MAX_ATTEMPTS: u32 = 100;

/// Typical gRPC message size limit, in bytes (`spec.md` §4.7).
pub const TYPICAL_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Hard upper bound on gRPC message size, in bytes (`spec.md` §4.7).
pub const HARD_MAX_MESSAGE_SIZE: u64 = 10 * 1024 * 1024 * 1024;
