//! Error types for the shared clock and random sources.

use thiserror::Error;

/// Result type alias using the shared error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while constructing a clock or random source.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Random sequence is empty")]
    EmptySequence,

    #[error("Random value {0} exceeds RANDOM_MAX")]
    OutOfRange(u64),
}
