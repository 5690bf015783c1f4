//! Error types for weekstore

use std::io;

use thiserror::Error;

/// Result type alias for weekstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for storage operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Settings file is malformed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Key contains characters outside `[A-Za-z0-9_.-]` or is empty
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Value contains a newline
    #[error("Invalid value for key {0:?}: values cannot contain newlines")]
    InvalidValue(String),

    /// Slot name is not a plain file name
    #[error("Invalid slot name: {0:?}")]
    InvalidSlotName(String),

    /// Store was closed
    #[error("Store is closed")]
    Closed,
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        Error::Parse(format!("{:?}", err))
    }
}
