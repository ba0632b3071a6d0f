//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    #[error("already listening")]
    AlreadyListening,

    #[error("send failed: {0}")]
    SendFailed(String),

    /// Command validation failure (`InvalidArgument`, `NotReady`,
    /// `Unsupported`); never reaches the wire
    #[error("command rejected: {0}")]
    Command(#[from] evonic_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] evonic_transport::TransportError),
}
