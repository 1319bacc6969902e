use bytes::Bytes;
use directory::{
    CloseReply, DirectoryRequest, DirectoryResponse, FileLocation, FileRequest, LocationReply, NodeId,
    PlacementReply, Timestamp, WriteReply, WriteRequest,
};
use locking::{LeaseReply, LockQuery, LockRequest, LockResponse};
use std::net::SocketAddr;
use storage::{FileQuery, StorageRequest, StorageResponse, WriteData};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{CacheEntry, CacheStats, ClientError, Config, FileCache, Result};

/// Result of asking the directory to open a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Exists(LocationReply),
    /// The file is unknown; the reply names a node it could be created on.
    Absent(PlacementReply),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Owned(LeaseReply),
    Locked(LeaseReply),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockGrant {
    Granted(LeaseReply),
    Regranted(LeaseReply),
    Locked(LeaseReply),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub docname: String,
    pub node_id: NodeId,
    /// True when this write created the file's placement.
    pub created: bool,
    /// Timestamp this write was sent with.
    pub timestamp: Timestamp,
    /// Timestamp the directory holds after the commit.
    pub committed: Timestamp,
}

/// Caching client for the file store.
///
/// Reads are served from the local cache when the cached copy is at least
/// as new as the directory's timestamp. Writes take the file's lease
/// before touching the directory or a storage node.
pub struct Client {
    id: String,
    config: Config,
    cache: Mutex<FileCache>,
    last_timestamp: Mutex<Timestamp>,
}

impl Client {
    pub fn new(config: Config) -> Self {
        let id = Uuid::new_v4().to_string();
        tracing::debug!("Client {} using directory {} and lock service {}", id, config.directory, config.lock);

        Self {
            id,
            cache: Mutex::new(FileCache::new(config.cache_capacity)),
            last_timestamp: Mutex::new(Timestamp::default()),
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn open(&self, docname: &str) -> Result<OpenOutcome> {
        match self.directory(DirectoryRequest::Open(self.file_request(docname))).await? {
            DirectoryResponse::OpenExists(reply) => Ok(OpenOutcome::Exists(reply)),
            DirectoryResponse::OpenNull(reply) => Ok(OpenOutcome::Absent(reply)),
            DirectoryResponse::Error(reply) => Err(ClientError::from_reply(reply, docname)),
            other => Err(ClientError::unexpected(other)),
        }
    }

    pub async fn close(&self, docname: &str) -> Result<CloseReply> {
        match self.directory(DirectoryRequest::Close(self.file_request(docname))).await? {
            DirectoryResponse::Close(reply) => Ok(reply),
            DirectoryResponse::Error(reply) => Err(ClientError::from_reply(reply, docname)),
            other => Err(ClientError::unexpected(other)),
        }
    }

    /// Looks a file up without the directory proposing a placement.
    pub async fn locate(&self, docname: &str) -> Result<Option<FileLocation>> {
        match self.directory(DirectoryRequest::Read(self.file_request(docname))).await? {
            DirectoryResponse::ReadExists(reply) => Ok(Some(reply.location())),
            DirectoryResponse::ReadNull(_) => Ok(None),
            DirectoryResponse::Error(reply) => Err(ClientError::from_reply(reply, docname)),
            other => Err(ClientError::unexpected(other)),
        }
    }

    pub async fn check_lock(&self, docname: &str) -> Result<LockState> {
        match self.lock(LockRequest::CheckLock(self.lock_query(docname))).await? {
            LockResponse::Unlocked(_) => Ok(LockState::Unlocked),
            LockResponse::LockOwned(lease) => Ok(LockState::Owned(lease)),
            LockResponse::Locked(lease) => Ok(LockState::Locked(lease)),
            LockResponse::Error(reply) => Err(ClientError::from_reply(reply, docname)),
            other => Err(ClientError::unexpected(other)),
        }
    }

    pub async fn obtain_lock(&self, docname: &str) -> Result<LockGrant> {
        match self.lock(LockRequest::ObtainLock(self.lock_query(docname))).await? {
            LockResponse::LockGranted(lease) => Ok(LockGrant::Granted(lease)),
            LockResponse::LockRegranted(lease) => Ok(LockGrant::Regranted(lease)),
            LockResponse::Locked(lease) => Ok(LockGrant::Locked(lease)),
            LockResponse::Error(reply) => Err(ClientError::from_reply(reply, docname)),
            other => Err(ClientError::unexpected(other)),
        }
    }

    pub async fn read(&self, docname: &str) -> Result<Bytes> {
        let location = match self.open(docname).await {
            Ok(OpenOutcome::Exists(reply)) => reply.location(),
            Ok(OpenOutcome::Absent(_)) | Err(ClientError::NoNodesAvailable) => {
                return Err(ClientError::NotFound(docname.to_string()))
            }
            Err(e) => return Err(e),
        };

        if let Some(content) = self.cache.lock().await.fresh(docname, location.timestamp) {
            tracing::debug!("Read {} from cache at {}", docname, location.timestamp);
            return Ok(content);
        }

        let request = StorageRequest::Read(FileQuery {
            docname: docname.to_string(),
            client_id: Some(self.id.clone()),
        });
        let data = match self.storage(location.socket_addr(), request).await? {
            StorageResponse::Read(reply) => reply.data,
            StorageResponse::Error(reply) => return Err(ClientError::from_reply(reply, docname)),
            other => return Err(ClientError::unexpected(other)),
        };

        tracing::debug!(
            "Fetched {} ({} bytes) from node {} at {}",
            docname,
            data.len(),
            location.node_id,
            location.timestamp
        );
        self.cache.lock().await.insert(docname, data.clone(), location.timestamp);

        Ok(data)
    }

    pub async fn write(&self, docname: &str, data: impl Into<Bytes>) -> Result<WriteReceipt> {
        let data = data.into();
        if data.len() > storage::MAX_FILE_BYTES {
            return Err(ClientError::TooLarge {
                docname: docname.to_string(),
                size: data.len(),
                limit: storage::MAX_FILE_BYTES,
            });
        }

        if let LockGrant::Locked(lease) = self.obtain_lock(docname).await? {
            return Err(ClientError::Conflict {
                docname: docname.to_string(),
                owner: lease.client_id,
            });
        }

        let timestamp = self.next_timestamp().await;
        let (placement, created) = self.reserve(docname, timestamp).await?;

        // The cache is updated before the node acknowledges; a failed write
        // takes the entry back out.
        self.cache.lock().await.insert(docname, data.clone(), timestamp);

        let request = StorageRequest::Write(WriteData {
            docname: docname.to_string(),
            data,
            client_id: Some(self.id.clone()),
            timestamp: Some(timestamp),
        });
        let stored = match self.storage(placement.socket_addr(), request).await {
            Ok(StorageResponse::Write(ack)) => Ok(ack),
            Ok(StorageResponse::Error(reply)) => Err(ClientError::from_reply(reply, docname)),
            Ok(other) => Err(ClientError::unexpected(other)),
            Err(e) => Err(e),
        };
        let ack = match stored {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!("Write of {} to node {} failed: {}", docname, placement.node_id, e);
                self.cache.lock().await.remove(docname);
                return Err(e);
            }
        };

        let committed = self.commit(docname, timestamp).await?;

        tracing::debug!("Wrote {} to node {} at {}", docname, ack.node_id, timestamp);

        Ok(WriteReceipt {
            docname: docname.to_string(),
            node_id: ack.node_id,
            created,
            timestamp,
            committed,
        })
    }

    pub async fn cached(&self, docname: &str) -> Option<CacheEntry> {
        self.cache.lock().await.get(docname).cloned()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    async fn reserve(&self, docname: &str, timestamp: Timestamp) -> Result<(WriteReply, bool)> {
        let request = DirectoryRequest::Write(WriteRequest {
            docname: docname.to_string(),
            client_id: self.id.clone(),
            timestamp,
        });

        match self.directory(request).await? {
            DirectoryResponse::WriteNull(reply) => Ok((reply, true)),
            DirectoryResponse::WriteExists(reply) => Ok((reply, false)),
            DirectoryResponse::Error(reply) => Err(ClientError::from_reply(reply, docname)),
            other => Err(ClientError::unexpected(other)),
        }
    }

    async fn commit(&self, docname: &str, timestamp: Timestamp) -> Result<Timestamp> {
        let request = DirectoryRequest::Commit(WriteRequest {
            docname: docname.to_string(),
            client_id: self.id.clone(),
            timestamp,
        });

        match self.directory(request).await? {
            DirectoryResponse::Commit(reply) => Ok(reply.timestamp),
            DirectoryResponse::Error(reply) => Err(ClientError::from_reply(reply, docname)),
            other => Err(ClientError::unexpected(other)),
        }
    }

    /// Strictly increasing per client even if the wall clock stalls.
    async fn next_timestamp(&self) -> Timestamp {
        let mut last = self.last_timestamp.lock().await;
        let now = Timestamp::now();
        *last = if now > *last { now } else { Timestamp(last.0 + 1) };
        *last
    }

    fn file_request(&self, docname: &str) -> FileRequest {
        FileRequest {
            docname: docname.to_string(),
            client_id: self.id.clone(),
        }
    }

    fn lock_query(&self, docname: &str) -> LockQuery {
        LockQuery {
            docname: docname.to_string(),
            client_id: self.id.clone(),
        }
    }

    async fn directory(&self, request: DirectoryRequest) -> Result<DirectoryResponse> {
        Ok(network::send_request(self.config.directory, &request, self.config.request_timeout()).await?)
    }

    async fn lock(&self, request: LockRequest) -> Result<LockResponse> {
        Ok(network::send_request(self.config.lock, &request, self.config.request_timeout()).await?)
    }

    async fn storage(&self, node: SocketAddr, request: StorageRequest) -> Result<StorageResponse> {
        Ok(network::send_request(node, &request, self.config.request_timeout()).await?)
    }
}
