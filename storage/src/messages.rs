use bytes::Bytes;
use directory::{NodeId, Timestamp};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "lowercase")]
pub enum StorageRequest {
    Open(FileQuery),
    Close(FileQuery),
    Read(FileQuery),
    Write(WriteData),
}

impl network::WireRequest for StorageRequest {
    const KINDS: &'static [&'static str] = &["open", "close", "read", "write"];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub docname: String,
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Whole-file write. `data` is encoded as a JSON array of byte values, so
/// files are limited to [`MAX_FILE_BYTES`](crate::MAX_FILE_BYTES).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteData {
    pub docname: String,
    pub data: Bytes,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "lowercase")]
pub enum StorageResponse {
    Open(OpenReply),
    Close(NodeAddress),
    Read(ReadReply),
    Write(WriteAck),
    Error(network::ErrorReply),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeAddress {
    pub address: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenReply {
    pub docname: String,
    pub is_file: bool,
    pub address: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadReply {
    pub docname: String,
    pub address: IpAddr,
    pub port: u16,
    pub data: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WriteAck {
    pub docname: String,
    pub address: IpAddr,
    pub port: u16,
    pub node_id: NodeId,
}
