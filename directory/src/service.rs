use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::messages::*;
use crate::{Config, DirectoryError, DirectoryState, Result};

/// The directory service: answers where files live and places new ones.
///
/// All state sits behind one lock, so placing a new file and registering
/// a node are each a single critical section.
pub struct Directory {
    state: Arc<RwLock<DirectoryState>>,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState::new())),
        }
    }

    pub fn state(&self) -> Arc<RwLock<DirectoryState>> {
        self.state.clone()
    }

    pub async fn serve(config: &Config) -> Result<()> {
        let server = Self::bind(config).await?;
        server.run().await?;
        Ok(())
    }

    pub async fn bind(config: &Config) -> Result<network::Server<Self>> {
        let mut server = network::Server::bind(config.bind_address(), Self::new()).await?;
        if let Some(max) = config.max_connections {
            server = server.with_max_connections(max);
        }
        tracing::info!("Directory service bound to {}", server.local_addr()?);
        Ok(server)
    }

    async fn open(&self, req: FileRequest) -> Result<DirectoryResponse> {
        let state = self.state.read().await;

        match state.locate(&req.docname)? {
            Some(location) => Ok(DirectoryResponse::OpenExists(LocationReply::new(
                req.docname,
                location,
            ))),
            None => {
                let node = state.random_node()?;
                Ok(DirectoryResponse::OpenNull(PlacementReply {
                    docname: req.docname,
                    is_file: false,
                    node_id: node.node_id,
                    address: node.address,
                    port: node.port,
                }))
            }
        }
    }

    async fn read(&self, req: FileRequest) -> Result<DirectoryResponse> {
        let state = self.state.read().await;

        Ok(match state.locate(&req.docname)? {
            Some(location) => DirectoryResponse::ReadExists(LocationReply::new(req.docname, location)),
            None => DirectoryResponse::ReadNull(AbsentReply {
                docname: req.docname,
                is_file: false,
            }),
        })
    }

    async fn write(&self, req: WriteRequest) -> Result<DirectoryResponse> {
        let (location, created) = {
            let mut state = self.state.write().await;
            state.reserve(&req.docname, req.timestamp)?
        };

        let reply = WriteReply {
            docname: req.docname,
            is_file: !created,
            node_id: location.node_id,
            address: location.address,
            port: location.port,
            timestamp: req.timestamp,
        };

        Ok(if created {
            DirectoryResponse::WriteNull(reply)
        } else {
            DirectoryResponse::WriteExists(reply)
        })
    }

    async fn commit(&self, req: WriteRequest) -> Result<DirectoryResponse> {
        let timestamp = {
            let mut state = self.state.write().await;
            state.commit(&req.docname, req.timestamp)?
        };

        if timestamp != req.timestamp {
            tracing::debug!(
                "Commit of {} at {} superseded by {}",
                req.docname,
                req.timestamp,
                timestamp
            );
        }

        Ok(DirectoryResponse::Commit(CommitReply {
            docname: req.docname,
            timestamp,
        }))
    }

    async fn join(&self, req: JoinRequest) -> DirectoryResponse {
        let node_id = {
            let mut state = self.state.write().await;
            state.register(req.node_id, req.address, req.port)
        };

        DirectoryResponse::Join(JoinReply { node_id })
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl network::RequestHandler for Directory {
    type Request = DirectoryRequest;
    type Response = DirectoryResponse;

    async fn handle(&self, request: DirectoryRequest, peer: SocketAddr) -> DirectoryResponse {
        tracing::debug!("Directory request from {}: {:?}", peer, request);

        let result = match request {
            DirectoryRequest::Open(req) => self.open(req).await,
            DirectoryRequest::Read(req) => self.read(req).await,
            DirectoryRequest::Close(req) => Ok(DirectoryResponse::Close(CloseReply {
                docname: req.docname,
                is_file: true,
            })),
            DirectoryRequest::Write(req) => self.write(req).await,
            DirectoryRequest::Commit(req) => self.commit(req).await,
            DirectoryRequest::Join(req) => Ok(self.join(req).await),
        };

        result.unwrap_or_else(|err: DirectoryError| {
            tracing::warn!("Directory request from {} failed: {}", peer, err);
            DirectoryResponse::Error((&err).into())
        })
    }
}
