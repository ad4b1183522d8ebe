//! Error types for session storage operations.

use std::path::PathBuf;

use crate::codec::{DecodeError, EncodeError};

/// Error type for session storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Identifier does not match `^[0-9A-Za-z,-]+$`.
    #[error("Invalid session ID: '{0}'")]
    InvalidId(String),

    /// Storage directory is missing at container construction.
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Cookie/lookup key is empty or malformed.
    #[error("Invalid session key: '{0}'")]
    InvalidKey(String),

    /// Max-age must be positive.
    #[error("Invalid max-age value: {0}s")]
    InvalidMaxAge(u64),

    /// GC probability must lie in `0.0..=1.0`.
    #[error("Invalid GC probability value: {0}")]
    InvalidGcProbability(f64),

    /// Stored record could not be decoded.
    #[error("Failed to decode session: {0}")]
    Decode(#[from] DecodeError),

    /// Payload could not be encoded.
    #[error("Failed to encode session: {0}")]
    Encode(#[from] EncodeError),

    /// Filesystem failure on a record.
    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for session storage operations.
pub type Result<T> = std::result::Result<T, Error>;
