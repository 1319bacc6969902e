use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinidfsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] network::NetworkError),

    #[error("Directory error: {0}")]
    Directory(#[from] directory::DirectoryError),

    #[error("Lock service error: {0}")]
    Lock(#[from] locking::LockError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Client error: {0}")]
    Client(#[from] client::ClientError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Service stopped: {0}")]
    Stopped(String),
}

pub type Result<T> = std::result::Result<T, MinidfsError>;
