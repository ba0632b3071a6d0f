//! Client builder pattern

use std::time::Duration;

use evonic_core::DEFAULT_WS_PORT;

use crate::{Evonic, Result};

/// Default bound on the transport handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);

/// Builder for the Evonic client
pub struct EvonicBuilder {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl EvonicBuilder {
    /// Create a new builder for the fire at `host`
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            port: DEFAULT_WS_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the WebSocket port the firmware listens on
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the bound on the transport handshake
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build without connecting
    pub fn build(self) -> Evonic {
        Evonic::from_parts(self.host, self.port, self.connect_timeout)
    }

    /// Build and connect
    pub async fn connect(self) -> Result<Evonic> {
        let client = self.build();
        client.connect().await?;
        Ok(client)
    }
}
