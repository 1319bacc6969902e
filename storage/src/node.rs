use async_trait::async_trait;
use directory::{DirectoryRequest, DirectoryResponse, JoinRequest, NodeId};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::messages::*;
use crate::{Config, Result, StorageEngine, StorageError};

/// A storage node: serves whole-file reads and writes out of its engine.
pub struct StorageNode {
    engine: StorageEngine,
    node_id: NodeId,
    address: IpAddr,
    port: u16,
}

impl StorageNode {
    pub fn new(engine: StorageEngine, node_id: NodeId, address: IpAddr, port: u16) -> Self {
        Self {
            engine,
            node_id,
            address,
            port,
        }
    }

    pub async fn serve(config: &Config) -> Result<()> {
        let server = Self::start(config).await?;
        server.run().await?;
        Ok(())
    }

    /// Binds, learns the bound port, announces the node to the directory,
    /// and returns the server ready to run.
    pub async fn start(config: &Config) -> Result<network::Server<Self>> {
        let engine = StorageEngine::new(&config.storage_path).await?;

        let listener = TcpListener::bind(config.bind_address()).await?;
        let port = listener.local_addr()?.port();

        let node_id = join(
            config.directory,
            JoinRequest {
                node_id: config.node_id,
                address: config.address,
                port,
            },
            Duration::from_millis(config.request_timeout_ms),
        )
        .await?;

        tracing::info!(
            "Storage node {} is listening on {}:{}",
            node_id,
            config.address,
            port
        );

        let mut server = network::Server::from_listener(listener, Self::new(engine, node_id, config.address, port));
        if let Some(max) = config.max_connections {
            server = server.with_max_connections(max);
        }
        Ok(server)
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    async fn dispatch(&self, request: StorageRequest) -> Result<StorageResponse> {
        Ok(match request {
            StorageRequest::Open(query) => {
                let is_file = self.engine.exists(&query.docname).await?;
                StorageResponse::Open(OpenReply {
                    docname: query.docname,
                    is_file,
                    address: self.address,
                    port: self.port,
                })
            }
            StorageRequest::Close(_) => StorageResponse::Close(NodeAddress {
                address: self.address,
                port: self.port,
            }),
            StorageRequest::Read(query) => {
                let data = self.engine.read(&query.docname).await?;
                StorageResponse::Read(ReadReply {
                    docname: query.docname,
                    address: self.address,
                    port: self.port,
                    data,
                })
            }
            StorageRequest::Write(write) => {
                self.engine.write(&write.docname, &write.data).await?;
                StorageResponse::Write(WriteAck {
                    docname: write.docname,
                    address: self.address,
                    port: self.port,
                    node_id: self.node_id,
                })
            }
        })
    }
}

#[async_trait]
impl network::RequestHandler for StorageNode {
    type Request = StorageRequest;
    type Response = StorageResponse;

    async fn handle(&self, request: StorageRequest, peer: SocketAddr) -> StorageResponse {
        tracing::debug!("Storage request from {}: {:?}", peer, request_kind(&request));

        self.dispatch(request).await.unwrap_or_else(|err| {
            match &err {
                StorageError::NotFound(_) => tracing::debug!("{}", err),
                _ => tracing::error!("Storage request from {} failed: {}", peer, err),
            }
            StorageResponse::Error((&err).into())
        })
    }
}

fn request_kind(request: &StorageRequest) -> (&'static str, &str) {
    match request {
        StorageRequest::Open(q) => ("open", &q.docname),
        StorageRequest::Close(q) => ("close", &q.docname),
        StorageRequest::Read(q) => ("read", &q.docname),
        StorageRequest::Write(w) => ("write", &w.docname),
    }
}

async fn join(directory: SocketAddr, request: JoinRequest, deadline: Duration) -> Result<NodeId> {
    let response: DirectoryResponse =
        network::send_request(directory, &DirectoryRequest::Join(request), deadline).await?;

    match response {
        DirectoryResponse::Join(reply) => Ok(reply.node_id),
        DirectoryResponse::Error(reply) => Err(StorageError::JoinRejected(reply.error)),
        other => Err(StorageError::JoinRejected(format!("unexpected reply {:?}", other))),
    }
}
