//! Evonic Transport Layer
//!
//! The WebSocket plumbing under the Evonic client: trait seams for
//! sending/receiving text frames, the tokio-tungstenite client transport,
//! and a listener used to stand in for a fire in tests.

pub mod error;
pub mod traits;
pub mod websocket;

pub use error::{Result, TransportError};
pub use traits::{Transport, TransportEvent, TransportReceiver, TransportSender};
pub use websocket::{WebSocketReceiver, WebSocketSender, WebSocketServer, WebSocketTransport};
