//! Transport trait definitions

use async_trait::async_trait;

use crate::error::Result;

/// Events that can occur on a transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Connection established
    Connected,
    /// Connection closed (clean or error)
    Disconnected { reason: Option<String> },
    /// One complete text frame received
    Frame(String),
    /// Error occurred
    Error(String),
}

/// Trait for sending text frames
#[async_trait]
pub trait TransportSender: Send + Sync {
    /// Send one complete frame
    async fn send(&self, frame: String) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Close the connection
    async fn close(&self) -> Result<()>;
}

/// Trait for receiving transport events
#[async_trait]
pub trait TransportReceiver: Send {
    /// Receive the next event; `None` once the transport is gone
    async fn recv(&mut self) -> Option<TransportEvent>;
}

/// Main transport trait
#[async_trait]
pub trait Transport: Send + Sync {
    /// The sender type for this transport
    type Sender: TransportSender;
    /// The receiver type for this transport
    type Receiver: TransportReceiver;

    /// Connect to a remote endpoint
    async fn connect(url: &str) -> Result<(Self::Sender, Self::Receiver)>
    where
        Self: Sized;
}
