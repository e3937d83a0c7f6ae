//! Errors raised by Swamp lifecycle operations (`spec.md` §4.6, §7).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("swamp not found: {0}")]
    SwampNotFound(String),

    /// Raised when an operation is attempted against a Swamp that has
    /// already been `destroy`ed.
    #[error("swamp has been destroyed")]
    Destroyed,

    #[error(transparent)]
    Beacon(#[from] hydraide_beacon::Error),

    #[error(transparent)]
    Chronicler(#[from] hydraide_chronicler::Error),

    #[error(transparent)]
    Core(#[from] hydraide_core::Error),

    #[error("file I/O error: {0}")]
    FileIoError(String),
}

impl Error {
    pub(crate) fn from_io(e: std::io::Error) -> Self {
        Error::FileIoError(e.to_string())
    }
}
