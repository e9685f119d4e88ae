//! Server configuration.

use std::time::Duration;

use crate::protocol::{frame::DEFAULT_MAX_PAYLOAD, handshake::DEFAULT_MAX_HEAD};

/// Runtime settings for [`crate::ui::Server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to (e.g., "127.0.0.1")
    pub host: String,
    /// Port number to bind to. `0` picks an ephemeral port.
    pub port: u16,
    /// Request path of the WebSocket endpoint
    pub path: String,
    /// Largest accepted frame payload and reassembled message, in bytes
    pub max_frame_size: usize,
    /// Consecutive recoverable frame violations that close the connection
    pub max_frame_violations: u32,
    /// Interval of server-initiated pings. `None` disables liveness probing.
    pub ping_interval: Option<Duration>,
    /// Largest accepted HTTP request head, in bytes
    pub max_head_size: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            path: "/ws".to_string(),
            max_frame_size: DEFAULT_MAX_PAYLOAD,
            max_frame_violations: 3,
            ping_interval: None,
            max_head_size: DEFAULT_MAX_HEAD,
        }
    }
}
