mod lease;
mod messages;
mod service;

pub use lease::{Acquisition, Lease, LeaseTable, LockStatus};
pub use messages::*;
pub use service::LockService;

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const DEFAULT_LEASE_TIMEOUT_MS: u64 = 30_000;

/// Longest lease the service will grant: one week.
pub const MAX_LEASE_TIMEOUT_MS: u64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub address: IpAddr,
    pub port: u16,
    pub lease_timeout_ms: u64,
    pub max_connections: Option<usize>,
}

impl Config {
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Lease lifetime, clamped to `1..=MAX_LEASE_TIMEOUT_MS` milliseconds.
    pub fn lease_timeout(&self) -> chrono::Duration {
        let ms = self.lease_timeout_ms.clamp(1, MAX_LEASE_TIMEOUT_MS);
        chrono::Duration::milliseconds(ms as i64)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8888,
            lease_timeout_ms: DEFAULT_LEASE_TIMEOUT_MS,
            max_connections: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LockError>;

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Network error: {0}")]
    Network(#[from] network::NetworkError),
}
