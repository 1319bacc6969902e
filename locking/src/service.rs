use async_trait::async_trait;
use chrono::Utc;
use std::net::SocketAddr;
use tokio::sync::Mutex;

use crate::messages::*;
use crate::{Acquisition, Config, LeaseTable, LockStatus, Result};

/// Lease authority. Never talks to the directory or storage nodes.
pub struct LockService {
    table: Mutex<LeaseTable>,
}

impl LockService {
    pub fn new(config: &Config) -> Self {
        Self {
            table: Mutex::new(LeaseTable::new(config.lease_timeout())),
        }
    }

    pub async fn serve(config: &Config) -> Result<()> {
        let server = Self::bind(config).await?;
        server.run().await?;
        Ok(())
    }

    pub async fn bind(config: &Config) -> Result<network::Server<Self>> {
        let mut server = network::Server::bind(config.bind_address(), Self::new(config)).await?;
        if let Some(max) = config.max_connections {
            server = server.with_max_connections(max);
        }
        tracing::info!(
            "Lock service bound to {} (lease timeout {} ms)",
            server.local_addr()?,
            config.lease_timeout_ms
        );
        Ok(server)
    }

    pub async fn check(&self, query: LockQuery) -> LockResponse {
        let status = self
            .table
            .lock()
            .await
            .check(&query.docname, &query.client_id, Utc::now());

        match status {
            LockStatus::Unlocked => LockResponse::Unlocked(UnlockedReply {
                docname: query.docname,
            }),
            LockStatus::Owned(lease) => LockResponse::LockOwned(LeaseReply::new(query.docname, &lease)),
            LockStatus::Locked(lease) => LockResponse::Locked(LeaseReply::new(query.docname, &lease)),
        }
    }

    pub async fn obtain(&self, query: LockQuery) -> LockResponse {
        let acquisition = self
            .table
            .lock()
            .await
            .obtain(&query.docname, &query.client_id, Utc::now());

        match acquisition {
            Acquisition::Granted(lease) => {
                tracing::info!("Lock on {} granted to {}", query.docname, query.client_id);
                LockResponse::LockGranted(LeaseReply::new(query.docname, &lease))
            }
            Acquisition::Regranted(lease) => LockResponse::LockRegranted(LeaseReply::new(query.docname, &lease)),
            Acquisition::Locked(lease) => {
                tracing::debug!(
                    "Lock on {} refused to {}: held by {}",
                    query.docname,
                    query.client_id,
                    lease.owner
                );
                LockResponse::Locked(LeaseReply::new(query.docname, &lease))
            }
        }
    }
}

#[async_trait]
impl network::RequestHandler for LockService {
    type Request = LockRequest;
    type Response = LockResponse;

    async fn handle(&self, request: LockRequest, peer: SocketAddr) -> LockResponse {
        tracing::debug!("Lock request from {}: {:?}", peer, request);

        match request {
            LockRequest::CheckLock(query) => self.check(query).await,
            LockRequest::ObtainLock(query) => self.obtain(query).await,
        }
    }
}
