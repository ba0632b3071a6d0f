//! Observer contract

use evonic_core::{Device, Error, Event};

/// Caller-supplied callback surface, driven by the session's receive loop.
///
/// `on_event` runs synchronously on the loop, once per decoded event, in
/// frame-arrival order. Keep it fast and offload slow work onto your own
/// queue. Panics are caught and logged so one bad observer cannot kill the
/// loop.
pub trait Observer: Send + Sync {
    /// One decoded event together with the post-apply device snapshot
    fn on_event(&self, event: &Event, device: &Device);

    /// A frame failed to decode and was dropped; the loop continues
    fn on_decode_error(&self, _error: &Error) {}

    /// The connection died underneath the session. Terminal: the session is
    /// back in `Disconnected` and a fresh `connect` is required.
    fn on_connection_lost(&self, _reason: Option<String>) {}
}

/// Plain closures work as observers
impl<F> Observer for F
where
    F: Fn(&Event, &Device) + Send + Sync,
{
    fn on_event(&self, event: &Event, device: &Device) {
        self(event, device)
    }
}
