use serde::{Deserialize, Deserializer, Serialize};
use std::net::IpAddr;

use crate::{FileLocation, NodeId, Timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "lowercase")]
pub enum DirectoryRequest {
    Open(FileRequest),
    Read(FileRequest),
    Close(FileRequest),
    Write(WriteRequest),
    Commit(WriteRequest),
    Join(JoinRequest),
}

impl network::WireRequest for DirectoryRequest {
    const KINDS: &'static [&'static str] = &["open", "read", "close", "write", "commit", "join"];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRequest {
    pub docname: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    pub docname: String,
    pub client_id: String,
    pub timestamp: Timestamp,
}

/// Sent by a storage node on startup. A missing, null or empty `nodeId`
/// asks the directory to assign one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default, deserialize_with = "optional_node_id")]
    pub node_id: Option<NodeId>,
    pub address: IpAddr,
    pub port: u16,
}

fn optional_node_id<'de, D>(deserializer: D) -> Result<Option<NodeId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(NodeId::from_name))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "response")]
pub enum DirectoryResponse {
    #[serde(rename = "open-exists")]
    OpenExists(LocationReply),
    #[serde(rename = "open-null")]
    OpenNull(PlacementReply),
    #[serde(rename = "read-exists")]
    ReadExists(LocationReply),
    #[serde(rename = "read-null")]
    ReadNull(AbsentReply),
    #[serde(rename = "close")]
    Close(CloseReply),
    #[serde(rename = "write-exists")]
    WriteExists(WriteReply),
    #[serde(rename = "write-null")]
    WriteNull(WriteReply),
    #[serde(rename = "commit")]
    Commit(CommitReply),
    #[serde(rename = "join")]
    Join(JoinReply),
    #[serde(rename = "error")]
    Error(network::ErrorReply),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocationReply {
    pub docname: String,
    pub is_file: bool,
    pub node_id: NodeId,
    pub address: IpAddr,
    pub port: u16,
    pub timestamp: Timestamp,
}

impl LocationReply {
    pub fn new(docname: impl Into<String>, location: FileLocation) -> Self {
        Self {
            docname: docname.into(),
            is_file: true,
            node_id: location.node_id,
            address: location.address,
            port: location.port,
            timestamp: location.timestamp,
        }
    }

    pub fn location(&self) -> FileLocation {
        FileLocation {
            node_id: self.node_id,
            address: self.address,
            port: self.port,
            timestamp: self.timestamp,
        }
    }
}

/// Names the storage node where a not-yet-existing file may be created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlacementReply {
    pub docname: String,
    pub is_file: bool,
    pub node_id: NodeId,
    pub address: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AbsentReply {
    pub docname: String,
    pub is_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloseReply {
    pub docname: String,
    pub is_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WriteReply {
    pub docname: String,
    pub is_file: bool,
    pub node_id: NodeId,
    pub address: IpAddr,
    pub port: u16,
    /// Echo of the timestamp the writer supplied.
    pub timestamp: Timestamp,
}

impl WriteReply {
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.address, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommitReply {
    pub docname: String,
    /// Timestamp stored after the commit, which may be newer than the one
    /// the writer supplied.
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinReply {
    pub node_id: NodeId,
}
