//! Errors raised by Router/Client operations (`spec.md` §4.7, §7).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The configured server ranges leave at least one island in
    /// `[1, all_islands]` unowned.
    #[error("island range gap at island {at}")]
    RangeGap { at: u64 },

    /// Two servers claim the same island.
    #[error("island range overlap at island {at}")]
    RangeOverlap { at: u64 },

    #[error("TLS handshake failed: {0}")]
    TlsHandshakeError(String),

    #[error("server unavailable: {0}")]
    ServerUnavailable(String),

    /// The heartbeat probe succeeded at the transport level but the
    /// server's reported identity did not match the configured range.
    #[error("heartbeat mismatch: {0}")]
    HeartbeatMismatch(String),

    #[error("invalid certificate material: {0}")]
    InvalidCertificate(String),

    #[error(transparent)]
    Core(#[from] hydraide_core::Error),
}
