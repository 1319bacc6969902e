pub mod config;
pub mod error;
pub mod node;
pub mod shell;

pub use config::Config;
pub use error::{MinidfsError, Result};
pub use node::Node;

// Re-export key types from workspace crates
pub use client;
pub use directory;
pub use locking;
pub use network;
pub use storage;
