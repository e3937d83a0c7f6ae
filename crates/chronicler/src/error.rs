//! Errors raised by the Chronicler (`spec.md` §4.4).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file I/O error: {0}")]
    FileIoError(String),

    /// A block's compressed payload failed its CRC32C check.
    #[error("block CRC32C mismatch at offset {offset}")]
    BlockCrcMismatch { offset: u64 },

    /// The file header declared a format version this reader does not
    /// understand.
    #[error("unsupported format version {0}")]
    FormatVersionUnsupported(u16),

    /// An entry or footer record could not be parsed.
    #[error("corrupt entry: {0}")]
    CorruptEntry(String),

    /// A write was attempted against a writer that has already been closed
    /// and not yet lazily reopened.
    #[error("writer is closed")]
    WriterClosed,

    /// Propagated from `hydraide-core` (e.g. Treasure decode failures).
    #[error(transparent)]
    Core(#[from] hydraide_core::Error),
}

impl Error {
    pub(crate) fn from_io(e: std::io::Error) -> Self {
        Error::FileIoError(e.to_string())
    }
}
