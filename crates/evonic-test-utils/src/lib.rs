//! Common test helpers for the Evonic client crates
//!
//! - [`TestFire`]: in-process mock fire (a WebSocket listener) that records
//!   every frame the client writes and can push status frames back
//! - [`EventCollector`]: observer capturing events in arrival order
//! - Condition-based waiting (no hardcoded sleeps for assertions)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use evonic_client::Observer;
use evonic_core::{Device, Error, Event};
use evonic_transport::{
    TransportEvent, TransportReceiver, TransportSender, WebSocketSender, WebSocketServer,
};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Install a subscriber once so `RUST_LOG` works in tests
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check() {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

// ============================================================================
// TestFire - mock device with proper cleanup
// ============================================================================

/// A mock Evonic fire that automatically cleans up on drop.
///
/// Accepts one client at a time, records every frame it sends, and pushes
/// status frames back on request.
pub struct TestFire {
    port: u16,
    frames: Arc<Mutex<Vec<String>>>,
    client: Arc<Mutex<Option<Arc<WebSocketSender>>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestFire {
    /// Bind a listener on an ephemeral port and start accepting
    pub async fn start() -> Self {
        init_tracing();

        let mut server = WebSocketServer::bind("127.0.0.1:0")
            .await
            .expect("bind failed");
        let port = server.local_addr().expect("no local addr").port();

        let frames = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::new(Mutex::new(None));

        let task_frames = Arc::clone(&frames);
        let task_client = Arc::clone(&client);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((sender, mut receiver, _addr)) = server.accept().await else {
                    break;
                };
                *task_client.lock() = Some(Arc::new(sender));

                while let Some(event) = receiver.recv().await {
                    match event {
                        TransportEvent::Frame(text) => task_frames.lock().push(text),
                        TransportEvent::Disconnected { .. } => break,
                        _ => {}
                    }
                }

                *task_client.lock() = None;
            }
        });

        Self {
            port,
            frames,
            client,
            handle,
        }
    }

    /// Host the client should connect to
    pub fn host(&self) -> &str {
        "127.0.0.1"
    }

    /// Port the listener is bound to
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Frames received from the client so far, in arrival order
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    /// Wait until at least `count` frames have arrived
    pub async fn wait_for_frames(&self, count: usize, max_wait: Duration) -> bool {
        wait_for(
            || self.frames.lock().len() >= count,
            DEFAULT_CHECK_INTERVAL,
            max_wait,
        )
        .await
    }

    /// Wait until a client session is attached
    pub async fn wait_for_client(&self, max_wait: Duration) -> bool {
        wait_for(
            || self.client.lock().is_some(),
            DEFAULT_CHECK_INTERVAL,
            max_wait,
        )
        .await
    }

    /// Push one status frame to the connected client
    pub async fn push(&self, frame: &str) {
        let sender = self.client.lock().clone().expect("no client connected");
        sender.send(frame.to_string()).await.expect("push failed");
    }

    /// Drop the connection from the device side
    pub async fn kick(&self) {
        let sender = self.client.lock().clone();
        if let Some(sender) = sender {
            let _ = sender.close().await;
        }
    }
}

impl Drop for TestFire {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ============================================================================
// EventCollector - observer for subscription testing
// ============================================================================

/// Observer that records events in arrival order
#[derive(Clone, Default)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<Event>>>,
    decode_errors: Arc<Mutex<Vec<String>>>,
    lost: Arc<AtomicBool>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in dispatch order
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn decode_errors(&self) -> Vec<String> {
        self.decode_errors.lock().clone()
    }

    pub fn connection_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` events have been dispatched
    pub async fn wait_for_count(&self, count: usize, max_wait: Duration) -> bool {
        wait_for(
            || self.events.lock().len() >= count,
            DEFAULT_CHECK_INTERVAL,
            max_wait,
        )
        .await
    }

    /// Wait for the terminal connection-lost notification
    pub async fn wait_for_lost(&self, max_wait: Duration) -> bool {
        wait_for(
            || self.lost.load(Ordering::SeqCst),
            DEFAULT_CHECK_INTERVAL,
            max_wait,
        )
        .await
    }

    /// Wait until at least `count` decode errors have been surfaced
    pub async fn wait_for_decode_errors(&self, count: usize, max_wait: Duration) -> bool {
        wait_for(
            || self.decode_errors.lock().len() >= count,
            DEFAULT_CHECK_INTERVAL,
            max_wait,
        )
        .await
    }
}

impl Observer for EventCollector {
    fn on_event(&self, event: &Event, _device: &Device) {
        self.events.lock().push(event.clone());
    }

    fn on_decode_error(&self, error: &Error) {
        self.decode_errors.lock().push(error.to_string());
    }

    fn on_connection_lost(&self, _reason: Option<String>) {
        self.lost.store(true, Ordering::SeqCst);
    }
}
