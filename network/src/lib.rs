mod communication;
mod server;

pub use communication::{send_request, DEFAULT_REQUEST_TIMEOUT};
pub use server::{RequestHandler, Server};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Upper bound on a single request or reply body.
pub const MAX_MESSAGE_BYTES: u64 = 16 * 1024 * 1024;

/// A request enum that can be decoded off the wire.
///
/// `KINDS` lists every value of the `request` field the type accepts, so
/// unknown kinds can be told apart from known kinds with bad fields.
pub trait WireRequest: DeserializeOwned {
    const KINDS: &'static [&'static str];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCode {
    NotFound,
    Conflict,
    NoNodesAvailable,
    Protocol,
    Internal,
}

/// Structured error every service sends back under `"response": "error"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorReply {
    pub error: String,
    pub code: ErrorCode,
}

impl ErrorReply {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }

    pub fn protocol(error: impl Into<String>) -> Self {
        Self::new(ErrorCode::Protocol, error)
    }

    pub fn invalid_kind(kind: &str) -> Self {
        Self::protocol(format!("{} is not a valid request", kind))
    }
}

/// Reply used when a request could not be decoded into the handler's type.
#[derive(Debug, Serialize)]
#[serde(tag = "response", rename_all = "lowercase")]
pub(crate) enum FallbackReply {
    Error(ErrorReply),
}

/// Decodes one request, reporting unknown or missing kinds as
/// `"<kind> is not a valid request"`.
pub fn decode_request<R: WireRequest>(raw: &[u8]) -> std::result::Result<R, ErrorReply> {
    let value: serde_json::Value = serde_json::from_slice(raw)
        .map_err(|e| ErrorReply::protocol(format!("malformed message: {}", e)))?;

    let kind = match value.get("request") {
        Some(serde_json::Value::String(kind)) => kind.clone(),
        Some(other) => return Err(ErrorReply::invalid_kind(&other.to_string())),
        None => return Err(ErrorReply::invalid_kind("(missing)")),
    };

    if !R::KINDS.contains(&kind.as_str()) {
        return Err(ErrorReply::invalid_kind(&kind));
    }

    serde_json::from_value(value)
        .map_err(|e| ErrorReply::protocol(format!("malformed {} request: {}", kind, e)))
}

pub type Result<T> = std::result::Result<T, NetworkError>;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Message exceeds {} bytes", MAX_MESSAGE_BYTES)]
    MessageTooLarge,
}
