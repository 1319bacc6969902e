use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::error::{MinidfsError, Result};

/// Deployment-wide settings. Every service section is derived from this one
/// struct so a single JSON file can describe the whole system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub directory_address: IpAddr,
    pub directory_port: u16,
    pub lock_address: IpAddr,
    pub lock_port: u16,
    pub lease_timeout_ms: u64,
    pub storage_address: IpAddr,
    pub storage_port: u16,
    pub storage_path: PathBuf,
    pub node_id: Option<directory::NodeId>,
    pub request_timeout_ms: u64,
    pub cache_capacity: Option<usize>,
    pub max_connections: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            directory_port: 8080,
            lock_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            lock_port: 8888,
            lease_timeout_ms: locking::DEFAULT_LEASE_TIMEOUT_MS,
            storage_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            storage_port: 0,
            storage_path: PathBuf::from("FileServerBucket"),
            node_id: None,
            request_timeout_ms: 5_000,
            cache_capacity: None,
            max_connections: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| MinidfsError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lease_timeout_ms == 0 || self.lease_timeout_ms > locking::MAX_LEASE_TIMEOUT_MS {
            return Err(MinidfsError::InvalidConfig(format!(
                "lease_timeout_ms must be between 1 and {}, got {}",
                locking::MAX_LEASE_TIMEOUT_MS,
                self.lease_timeout_ms
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(MinidfsError::InvalidConfig("request_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Address peers use to reach the directory.
    pub fn directory_endpoint(&self) -> SocketAddr {
        SocketAddr::new(reachable(self.directory_address), self.directory_port)
    }

    /// Address peers use to reach the lock service.
    pub fn lock_endpoint(&self) -> SocketAddr {
        SocketAddr::new(reachable(self.lock_address), self.lock_port)
    }
}

// A wildcard bind address is not something a peer can connect to.
fn reachable(address: IpAddr) -> IpAddr {
    if address.is_unspecified() {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        address
    }
}

impl From<&Config> for directory::Config {
    fn from(config: &Config) -> Self {
        directory::Config {
            address: config.directory_address,
            port: config.directory_port,
            max_connections: config.max_connections,
        }
    }
}

impl From<&Config> for locking::Config {
    fn from(config: &Config) -> Self {
        locking::Config {
            address: config.lock_address,
            port: config.lock_port,
            lease_timeout_ms: config.lease_timeout_ms,
            max_connections: config.max_connections,
        }
    }
}

impl From<&Config> for storage::Config {
    fn from(config: &Config) -> Self {
        storage::Config {
            address: config.storage_address,
            port: config.storage_port,
            directory: config.directory_endpoint(),
            storage_path: config.storage_path.clone(),
            node_id: config.node_id,
            request_timeout_ms: config.request_timeout_ms,
            max_connections: config.max_connections,
        }
    }
}

impl From<&Config> for client::Config {
    fn from(config: &Config) -> Self {
        client::Config {
            directory: config.directory_endpoint(),
            lock: config.lock_endpoint(),
            request_timeout_ms: config.request_timeout_ms,
            cache_capacity: config.cache_capacity,
        }
    }
}
