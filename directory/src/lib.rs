mod messages;
mod service;
mod state;

pub use messages::*;
pub use service::Directory;
pub use state::DirectoryState;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reads an id chosen by a storage node. A UUID is taken as is; any
    /// other name maps to the same name-based UUID every time.
    pub fn from_name(name: &str) -> Self {
        match Uuid::parse_str(name) {
            Ok(id) => Self(id),
            Err(_) => Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())),
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Logical timestamp used for cache freshness: microseconds since the Unix
/// epoch at the moment a client started a write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_micros())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StorageNodeRegistration {
    pub node_id: NodeId,
    pub address: IpAddr,
    pub port: u16,
}

impl StorageNodeRegistration {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// Where a file lives and the newest timestamp the directory has seen for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileLocation {
    pub node_id: NodeId,
    pub address: IpAddr,
    pub port: u16,
    pub timestamp: Timestamp,
}

impl FileLocation {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub address: IpAddr,
    pub port: u16,
    pub max_connections: Option<usize>,
}

impl Config {
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            max_connections: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DirectoryError>;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("No storage nodes available")]
    NoNodesAvailable,

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Storage node {0} is not registered")]
    UnknownNode(NodeId),

    #[error("Network error: {0}")]
    Network(#[from] network::NetworkError),
}

impl From<&DirectoryError> for network::ErrorReply {
    fn from(err: &DirectoryError) -> Self {
        use network::{ErrorCode, ErrorReply};
        let code = match err {
            DirectoryError::NoNodesAvailable => ErrorCode::NoNodesAvailable,
            DirectoryError::NotFound(_) => ErrorCode::NotFound,
            DirectoryError::UnknownNode(_) | DirectoryError::Network(_) => ErrorCode::Internal,
        };
        ErrorReply::new(code, err.to_string())
    }
}
