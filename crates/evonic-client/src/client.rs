//! The Evonic client: session lifecycle, receive loop, command API

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use evonic_core::{codec, command, Command, Device, Event, ModuleId, PowerCommand};
use evonic_transport::{
    Transport, TransportEvent, TransportReceiver, TransportSender, WebSocketReceiver,
    WebSocketSender, WebSocketTransport,
};

use crate::error::{ClientError, Result};
use crate::observer::Observer;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// State shared between the client handle and the receive loop
struct Shared {
    state: RwLock<SessionState>,
    /// Last-known device snapshot, swapped whole so readers never observe a
    /// half-applied frame
    device: RwLock<Arc<Device>>,
    /// Writer channel; one task drains it, which serializes concurrent
    /// command writes on the wire
    tx: RwLock<Option<mpsc::Sender<String>>>,
    socket: RwLock<Option<Arc<WebSocketSender>>>,
    /// Bumped on every successful connect so a stale receive loop cannot
    /// tear down a newer session
    generation: AtomicU64,
}

impl Shared {
    fn snapshot(&self) -> Arc<Device> {
        Arc::clone(&self.device.read())
    }

    fn apply(&self, event: &Event) -> Arc<Device> {
        let mut guard = self.device.write();
        let mut next = Device::clone(&guard);
        next.apply(event);
        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        next
    }

    fn is_closing(&self) -> bool {
        matches!(
            *self.state.read(),
            SessionState::Disconnecting | SessionState::Disconnected
        )
    }

    /// Tear down this session's resources if it is still the current one.
    /// Returns true when the session ended unexpectedly, in which case the
    /// caller delivers the terminal notification.
    fn end_session(&self, session: u64) -> bool {
        if self.generation.load(Ordering::SeqCst) != session {
            return false;
        }
        let was_closing = self.is_closing();
        *self.tx.write() = None;
        *self.socket.write() = None;
        *self.state.write() = SessionState::Disconnected;
        !was_closing
    }
}

/// Client for one Evonic fire.
///
/// One client owns at most one session (one socket) at a time. Controlling
/// several fires means instantiating several independent clients; there is no
/// shared registry.
pub struct Evonic {
    host: String,
    port: u16,
    connect_timeout: Duration,
    shared: Arc<Shared>,
    /// Receiver parked between `connect` and `listen`
    reader: Mutex<Option<(WebSocketReceiver, watch::Receiver<bool>)>>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl Evonic {
    /// Create a client for the fire at `host` with default settings
    pub fn new(host: &str) -> Self {
        crate::EvonicBuilder::new(host).build()
    }

    /// Create a builder
    pub fn builder(host: &str) -> crate::EvonicBuilder {
        crate::EvonicBuilder::new(host)
    }

    pub(crate) fn from_parts(host: String, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host,
            port,
            connect_timeout,
            shared: Arc::new(Shared {
                state: RwLock::new(SessionState::Disconnected),
                device: RwLock::new(Arc::new(Device::default())),
                tx: RwLock::new(None),
                socket: RwLock::new(None),
                generation: AtomicU64::new(0),
            }),
            reader: Mutex::new(None),
            shutdown: Mutex::new(None),
        }
    }

    /// Open the WebSocket to the fire.
    ///
    /// Only valid from `Disconnected`; a second call while a session exists
    /// fails with [`ClientError::AlreadyConnected`].
    pub async fn connect(&self) -> Result<()> {
        {
            let mut state = self.shared.state.write();
            if *state != SessionState::Disconnected {
                return Err(ClientError::AlreadyConnected);
            }
            *state = SessionState::Connecting;
        }

        let url = format!("ws://{}:{}", self.host, self.port);
        info!("Connecting to {}", url);

        let (socket, receiver) =
            match timeout(self.connect_timeout, WebSocketTransport::connect(&url)).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => {
                    *self.shared.state.write() = SessionState::Disconnected;
                    return Err(ClientError::ConnectionFailed(e.to_string()));
                }
                Err(_) => {
                    *self.shared.state.write() = SessionState::Disconnected;
                    return Err(ClientError::ConnectionFailed(format!(
                        "handshake timed out after {:?}",
                        self.connect_timeout
                    )));
                }
            };

        let socket = Arc::new(socket);

        // Writer task; the channel is the write serialization point
        let (tx, mut rx) = mpsc::channel::<String>(100);
        let writer = Arc::clone(&socket);
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = writer.send(frame).await {
                    error!("Send error: {}", e);
                    break;
                }
            }
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Retire any stale receive loop before the new session's state lands
        self.shared.generation.fetch_add(1, Ordering::SeqCst);

        // Fresh session, fresh snapshot: the fire re-announces its status
        *self.shared.device.write() = Arc::new(Device::default());
        *self.shared.tx.write() = Some(tx);
        *self.shared.socket.write() = Some(socket);
        *self.reader.lock() = Some((receiver, shutdown_rx));
        *self.shutdown.lock() = Some(shutdown_tx);
        *self.shared.state.write() = SessionState::Connected;

        info!("Connected to {}", self.host);
        Ok(())
    }

    /// Start the background receive loop, dispatching every decoded event to
    /// `observer` in frame-arrival order.
    ///
    /// May only be called once per connected session; a second call fails
    /// with [`ClientError::AlreadyListening`].
    pub fn listen<O>(&self, observer: O) -> Result<()>
    where
        O: Observer + 'static,
    {
        if *self.shared.state.read() != SessionState::Connected {
            return Err(ClientError::NotConnected);
        }

        let (receiver, shutdown) = self
            .reader
            .lock()
            .take()
            .ok_or(ClientError::AlreadyListening)?;

        let shared = Arc::clone(&self.shared);
        let session = shared.generation.load(Ordering::SeqCst);
        tokio::spawn(run_session(shared, session, receiver, shutdown, observer));
        Ok(())
    }

    /// Close the session.
    ///
    /// Safe from any state; calling while already disconnected is a no-op.
    /// Signals the receive loop, closes the socket and releases everything;
    /// afterwards the state is `Disconnected` and `connect` may be called
    /// again.
    pub async fn disconnect(&self) {
        {
            let mut state = self.shared.state.write();
            if *state == SessionState::Disconnected {
                return;
            }
            *state = SessionState::Disconnecting;
        }

        info!("Disconnecting from {}", self.host);

        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(true);
        }
        // Loop may never have been started
        self.reader.lock().take();
        self.shared.tx.write().take();

        let socket = self.shared.socket.write().take();
        if let Some(socket) = socket {
            let _ = socket.close().await;
        }

        *self.shared.state.write() = SessionState::Disconnected;
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.shared.state.read()
    }

    /// Whether a session is currently established and the socket is alive
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
            && self
                .shared
                .socket
                .read()
                .as_ref()
                .map_or(false, |socket| socket.is_connected())
    }

    /// Last-known device snapshot
    pub fn device(&self) -> Arc<Device> {
        self.shared.snapshot()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Switch the main flame lighting on/off/toggle
    pub async fn light_power(&self, cmd: PowerCommand) -> Result<()> {
        self.ensure_connected()?;
        self.issue(command::light_power(cmd)).await
    }

    /// Switch the heater on/off/toggle
    pub async fn heater_power(&self, cmd: PowerCommand) -> Result<()> {
        self.ensure_connected()?;
        self.issue(command::heater_power(cmd)).await
    }

    /// Toggle the feature light
    pub async fn toggle_feature_light(&self) -> Result<()> {
        self.ensure_connected()?;
        let device = self.shared.snapshot();
        self.issue(command::toggle_feature_light(&device)?).await
    }

    /// Set the brightness of one RGB strip, 0-255
    pub async fn set_light_brightness(&self, rgb_id: ModuleId, brightness: i64) -> Result<()> {
        self.ensure_connected()?;
        let device = self.shared.snapshot();
        self.issue(command::set_light_brightness(&device, rgb_id, brightness)?)
            .await
    }

    /// Set the animation speed of one RGB strip, 0-255
    pub async fn set_animation_speed(&self, rgb_id: ModuleId, speed: i64) -> Result<()> {
        self.ensure_connected()?;
        let device = self.shared.snapshot();
        self.issue(command::set_animation_speed(&device, rgb_id, speed)?)
            .await
    }

    /// Set the thermostat target; the valid range follows the unit the fire
    /// last reported
    pub async fn set_temperature(&self, temp: i64) -> Result<()> {
        self.ensure_connected()?;
        let device = self.shared.snapshot();
        self.issue(command::set_temperature(&device, temp)?).await
    }

    /// Select a lighting effect by name
    pub async fn set_effect(&self, name: &str) -> Result<()> {
        self.ensure_connected()?;
        let device = self.shared.snapshot();
        self.issue(command::set_effect(&device, name)?).await
    }

    fn ensure_connected(&self) -> Result<()> {
        if *self.shared.state.read() == SessionState::Connected {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// Encode and enqueue one command; resolves once the writer has accepted
    /// the frame. Fire-and-forget: effects come back later as events.
    async fn issue(&self, command: Command) -> Result<()> {
        let frame = codec::encode(&command)?;
        debug!("Sending command: {}", frame);

        let tx = self.shared.tx.read().clone();
        match tx {
            Some(tx) => tx
                .send(frame)
                .await
                .map_err(|e| ClientError::SendFailed(e.to_string())),
            None => Err(ClientError::NotConnected),
        }
    }
}

/// The receive loop: one per session, sole writer of the device snapshot.
async fn run_session<O>(
    shared: Arc<Shared>,
    session: u64,
    mut receiver: WebSocketReceiver,
    mut shutdown: watch::Receiver<bool>,
    observer: O,
) where
    O: Observer + 'static,
{
    // Some(reason) once the socket closed underneath us
    let mut lost: Option<Option<String>> = None;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = receiver.recv() => match event {
                Some(TransportEvent::Frame(frame)) => handle_frame(&shared, &observer, &frame),
                Some(TransportEvent::Connected) => {}
                Some(TransportEvent::Error(e)) => warn!("Transport error: {}", e),
                Some(TransportEvent::Disconnected { reason }) => {
                    lost = Some(reason);
                    break;
                }
                None => {
                    lost = Some(None);
                    break;
                }
            }
        }
    }

    if shared.end_session(session) {
        let reason = lost.flatten();
        info!("Connection lost: {:?}", reason);
        isolate("connection-lost handler", || {
            observer.on_connection_lost(reason)
        });
    }
    debug!("Receive loop finished");
}

/// Decode one frame, apply its events, dispatch to the observer in order.
/// Undecodable frames are dropped; the loop stays alive.
fn handle_frame<O: Observer>(shared: &Arc<Shared>, observer: &O, frame: &str) {
    match codec::decode(frame) {
        Ok(events) => {
            for event in events {
                let device = shared.apply(&event);
                isolate("observer", || observer.on_event(&event, &device));
            }
        }
        Err(e) => {
            warn!("Dropping undecodable frame: {}", e);
            isolate("decode-error handler", || observer.on_decode_error(&e));
        }
    }
}

/// One misbehaving observer must not kill the receive loop
fn isolate(what: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!("{} panicked", what);
    }
}
