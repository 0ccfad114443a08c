//! Error types for leveldump.

use std::io;
use thiserror::Error;

/// The result type used throughout leveldump.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for leveldump decoding operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A file or directory could not be read.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A table file does not end with the table magic number.
    #[error("Missing footer: table magic number not found")]
    MissingFooter,

    /// A block's layout could not be decoded.
    #[error("Malformed block: {0}")]
    MalformedBlock(String),

    /// A varint ran past the end of its buffer.
    #[error("Truncated varint at offset {offset}")]
    TruncatedVarint {
        /// Offset of the first byte of the varint within the decoded buffer.
        offset: usize,
    },

    /// An internal key was too short or carried an unknown value type.
    #[error("Malformed internal key: {0}")]
    MalformedInternalKey(String),

    /// A block payload could not be decompressed.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// A structural value points outside its container.
    #[error("Format error: {0}")]
    Format(String),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Creates a new malformed block error.
    pub fn malformed_block(msg: impl Into<String>) -> Self {
        Error::MalformedBlock(msg.into())
    }

    /// Creates a new malformed internal key error.
    pub fn malformed_key(msg: impl Into<String>) -> Self {
        Error::MalformedInternalKey(msg.into())
    }

    /// Creates a new format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

/// The outcome of a decode pass that keeps whatever it managed to read.
///
/// Block and log decoding stop at the first structural problem instead of
/// failing outright. `items` holds everything decoded before the stop and
/// `error` holds the reason, so callers choose whether partial data is
/// acceptable.
#[derive(Debug)]
pub struct Partial<T> {
    /// Items decoded before the pass ended.
    pub items: Vec<T>,
    /// The error that ended the pass early, if any.
    pub error: Option<Error>,
}

impl<T> Partial<T> {
    /// A pass that consumed its whole input.
    pub fn complete(items: Vec<T>) -> Self {
        Self { items, error: None }
    }

    /// A pass that stopped early on `error`.
    pub fn truncated(items: Vec<T>, error: Error) -> Self {
        Self { items, error: Some(error) }
    }

    /// Returns true if no error ended the pass.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Discards the partial items if the pass stopped early.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.error {
            None => Ok(self.items),
            Some(e) => Err(e),
        }
    }

    /// Maps every decoded item, keeping the error.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Partial<U> {
        Partial { items: self.items.into_iter().map(f).collect(), error: self.error }
    }
}
