//! Evonic Protocol Core
//!
//! Pure protocol primitives for Evonic electric fires:
//! - Command and event types ([`Command`], [`Event`])
//! - JSON text frame encoding/decoding ([`codec`])
//! - Command validation ([`command`])
//! - Last-known device state ([`Device`])
//!
//! No I/O happens here; the session layer in `evonic-client` owns the socket.

pub mod codec;
pub mod command;
pub mod device;
pub mod effects;
pub mod error;
pub mod types;

pub use codec::{decode, encode};
pub use device::{Device, ModuleState};
pub use error::{Error, Result};
pub use types::*;

/// WebSocket port the fire's firmware listens on
pub const DEFAULT_WS_PORT: u16 = 81;
