mod cache;
mod client;

pub use cache::{CacheEntry, CacheStats, FileCache};
pub use client::{Client, LockGrant, LockState, OpenOutcome, WriteReceipt};

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub directory: SocketAddr,
    pub lock: SocketAddr,
    pub request_timeout_ms: u64,
    /// Maximum number of cached files; `None` keeps every file read or written.
    pub cache_capacity: Option<usize>,
}

impl Config {
    pub fn new(directory: SocketAddr, lock: SocketAddr) -> Self {
        Self {
            directory,
            lock,
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            lock: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8888),
            request_timeout_ms: 5_000,
            cache_capacity: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("{docname} is locked by another client ({owner})")]
    Conflict { docname: String, owner: String },

    #[error("No storage nodes available")]
    NoNodesAvailable,

    #[error("{docname} is {size} bytes, more than the {limit} byte limit")]
    TooLarge { docname: String, size: usize, limit: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(#[from] network::NetworkError),
}

impl ClientError {
    pub(crate) fn from_reply(reply: network::ErrorReply, docname: &str) -> Self {
        use network::ErrorCode;
        match reply.code {
            ErrorCode::NotFound => ClientError::NotFound(docname.to_string()),
            ErrorCode::NoNodesAvailable => ClientError::NoNodesAvailable,
            ErrorCode::Conflict => ClientError::Conflict {
                docname: docname.to_string(),
                owner: reply.error,
            },
            ErrorCode::Protocol => ClientError::Protocol(reply.error),
            ErrorCode::Internal => ClientError::Server(reply.error),
        }
    }

    pub(crate) fn unexpected(what: impl std::fmt::Debug) -> Self {
        ClientError::Protocol(format!("unexpected reply {:?}", what))
    }
}
