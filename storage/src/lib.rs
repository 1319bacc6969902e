mod engine;
mod messages;
mod node;

pub use engine::StorageEngine;
pub use messages::*;
pub use node::StorageNode;

use directory::NodeId;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Largest file a single write can carry. Contents travel as a JSON array
/// of numbers, up to four bytes per content byte, and the request must stay
/// under `network::MAX_MESSAGE_BYTES` with room for the other fields.
pub const MAX_FILE_BYTES: usize = (network::MAX_MESSAGE_BYTES as usize) / 4 - 64 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the node binds to and announces to the directory.
    pub address: IpAddr,
    /// 0 lets the OS pick a free port.
    pub port: u16,
    pub directory: SocketAddr,
    pub storage_path: PathBuf,
    /// Identity to re-use across restarts; the directory assigns one when unset.
    pub node_id: Option<NodeId>,
    pub request_timeout_ms: u64,
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
            port: 0,
            directory: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            storage_path: PathBuf::from("FileServerBucket"),
            node_id: None,
            request_timeout_ms: 5_000,
            max_connections: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_files: u64,
    pub total_size_bytes: u64,
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Directory rejected join: {0}")]
    JoinRejected(String),

    #[error("Network error: {0}")]
    Network(#[from] network::NetworkError),
}

impl From<&StorageError> for network::ErrorReply {
    fn from(err: &StorageError) -> Self {
        use network::{ErrorCode, ErrorReply};
        let code = match err {
            StorageError::NotFound(_) => ErrorCode::NotFound,
            _ => ErrorCode::Internal,
        };
        ErrorReply::new(code, err.to_string())
    }
}
