//! Listener and cadence settings

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default WebSocket port
pub const DEFAULT_PORT: u16 = 8765;

/// Delay between two position frames on a session
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub interval: Duration,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            interval: DEFAULT_INTERVAL,
        }
    }
}
