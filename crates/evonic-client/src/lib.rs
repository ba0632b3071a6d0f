//! Evonic Client Library
//!
//! High-level async client for Evonic electric fires.
//!
//! # Example
//!
//! ```ignore
//! use evonic_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let fire = Evonic::new("192.168.1.190");
//!     fire.connect().await?;
//!
//!     // Watch for state updates
//!     fire.listen(|event: &Event, _device: &Device| {
//!         println!("update: {:?}", event);
//!     })?;
//!
//!     fire.light_power(PowerCommand::On).await?;
//!     fire.set_light_brightness(0, 200).await?;
//!
//!     fire.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod error;
pub mod observer;

pub use builder::EvonicBuilder;
pub use client::{Evonic, SessionState};
pub use error::{ClientError, Result};
pub use observer::Observer;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::EvonicBuilder;
    pub use crate::client::{Evonic, SessionState};
    pub use crate::error::{ClientError, Result};
    pub use crate::observer::Observer;
    pub use evonic_core::{Device, Event, PowerCommand, TempUnit};
}
