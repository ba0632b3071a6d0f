//! WebSocket transport implementation
//!
//! The fire's firmware speaks plain `ws://` with JSON text frames and no
//! subprotocol. Reads and writes run on independent tasks so neither
//! direction ever blocks the other; outbound frames are serialized through
//! one writer task.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{Transport, TransportEvent, TransportReceiver, TransportSender};

/// WebSocket transport
pub struct WebSocketTransport;

/// WebSocket sender
pub struct WebSocketSender {
    tx: mpsc::Sender<WsMessage>,
    connected: Arc<Mutex<bool>>,
}

#[async_trait]
impl TransportSender for WebSocketSender {
    async fn send(&self, frame: String) -> Result<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        self.tx
            .send(WsMessage::Text(frame))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    async fn close(&self) -> Result<()> {
        let _ = self.tx.send(WsMessage::Close(None)).await;
        *self.connected.lock() = false;
        Ok(())
    }
}

/// WebSocket receiver
pub struct WebSocketReceiver {
    rx: mpsc::Receiver<TransportEvent>,
}

#[async_trait]
impl TransportReceiver for WebSocketReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    type Sender = WebSocketSender;
    type Receiver = WebSocketReceiver;

    async fn connect(url: &str) -> Result<(Self::Sender, Self::Receiver)> {
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        debug!("WebSocket connected, response: {:?}", response.status());

        let (write, read) = ws_stream.split();

        let (send_tx, send_rx) = mpsc::channel::<WsMessage>(100);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(100);

        let connected = Arc::new(Mutex::new(true));
        spawn_io_tasks(write, read, send_rx, event_tx, connected.clone());

        let sender = WebSocketSender {
            tx: send_tx,
            connected,
        };
        let receiver = WebSocketReceiver { rx: event_rx };

        Ok((sender, receiver))
    }
}

/// WebSocket listener, stands in for a fire in tests
pub struct WebSocketServer {
    listener: tokio::net::TcpListener,
}

impl WebSocketServer {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        info!("WebSocket server listening on {}", addr);

        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(TransportError::Io)
    }

    /// Accept a new connection
    pub async fn accept(&mut self) -> Result<(WebSocketSender, WebSocketReceiver, SocketAddr)> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        debug!("Accepted TCP connection from {}", addr);

        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        info!("WebSocket client connected from {}", addr);

        let (write, read) = ws_stream.split();

        let (send_tx, send_rx) = mpsc::channel::<WsMessage>(100);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(100);

        let connected = Arc::new(Mutex::new(true));
        spawn_io_tasks(write, read, send_rx, event_tx, connected.clone());

        let sender = WebSocketSender {
            tx: send_tx,
            connected,
        };
        let receiver = WebSocketReceiver { rx: event_rx };

        Ok((sender, receiver, addr))
    }
}

/// Writer task drains the send channel; reader task turns socket messages
/// into transport events. Both flip `connected` off when they stop.
fn spawn_io_tasks<W, R>(
    mut write: W,
    mut read: R,
    mut send_rx: mpsc::Receiver<WsMessage>,
    event_tx: mpsc::Sender<TransportEvent>,
    connected: Arc<Mutex<bool>>,
) where
    W: Sink<WsMessage> + Unpin + Send + 'static,
    W::Error: std::fmt::Display,
    R: Stream<Item = std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + Unpin
        + Send
        + 'static,
{
    let connected_write = connected.clone();
    tokio::spawn(async move {
        while let Some(msg) = send_rx.recv().await {
            if let Err(e) = write.send(msg).await {
                error!("WebSocket write error: {}", e);
                break;
            }
        }
        *connected_write.lock() = false;
    });

    let connected_read = connected;
    tokio::spawn(async move {
        let _ = event_tx.send(TransportEvent::Connected).await;

        while let Some(result) = read.next().await {
            match result {
                Ok(msg) => match msg {
                    WsMessage::Text(text) => {
                        let _ = event_tx.send(TransportEvent::Frame(text)).await;
                    }
                    WsMessage::Binary(data) => match String::from_utf8(data) {
                        // The firmware occasionally tags JSON frames binary
                        Ok(text) => {
                            let _ = event_tx.send(TransportEvent::Frame(text)).await;
                        }
                        Err(_) => {
                            warn!("Dropping non-UTF8 binary frame");
                        }
                    },
                    WsMessage::Ping(_) => {
                        debug!("Received ping");
                        // Pong is handled automatically by tungstenite
                    }
                    WsMessage::Pong(_) => {
                        debug!("Received pong");
                    }
                    WsMessage::Close(frame) => {
                        let reason = frame.map(|f| f.reason.to_string());
                        info!("WebSocket closed: {:?}", reason);
                        let _ = event_tx.send(TransportEvent::Disconnected { reason }).await;
                        break;
                    }
                    WsMessage::Frame(_) => {
                        // Raw frame, ignore
                    }
                },
                Err(e) => {
                    error!("WebSocket read error: {}", e);
                    let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                    let _ = event_tx
                        .send(TransportEvent::Disconnected {
                            reason: Some(e.to_string()),
                        })
                        .await;
                    break;
                }
            }
        }

        *connected_read.lock() = false;
    });
}
