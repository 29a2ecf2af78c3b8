//! Debug server configuration

use std::net::{Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 10001;

/// Debug server configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugServerConfig {
    /// Address to listen on
    pub bind_address: SocketAddr,
    /// Connections beyond this are closed right after accept
    pub max_clients: usize,
    /// Bytes read per socket per update
    pub read_buffer_size: usize,
    /// Largest accepted payload; bigger frames disconnect the client
    pub max_frame_size: usize,
    /// Unsent bytes queued per client; a client that falls further behind is disconnected
    pub max_outbox_bytes: usize,
}

impl Default for DebugServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_clients: 16,
            read_buffer_size: 16 * 1024,
            max_frame_size: 1024 * 1024,
            max_outbox_bytes: 4 * 1024 * 1024,
        }
    }
}

impl DebugServerConfig {
    /// Default configuration listening on `port`.
    pub fn with_port(port: u16) -> Self {
        let mut config = Self::default();
        config.bind_address.set_port(port);
        config
    }
}
