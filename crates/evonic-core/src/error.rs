//! Error types for the Evonic protocol core

use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Protocol error types
#[derive(Error, Debug)]
pub enum Error {
    /// Command parameter rejected before reaching the wire
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Validation needs device state that has not been reported yet
    #[error("device state not ready: {0}")]
    NotReady(String),

    /// The fire does not support the requested feature
    #[error("unsupported on this device: {0}")]
    Unsupported(String),

    /// Command could not be encoded (programmer error)
    #[error("encode error: {0}")]
    Encode(String),

    /// Malformed or unrecognized inbound frame
    #[error("decode error: {0}")]
    Decode(String),
}
