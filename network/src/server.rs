use async_trait::async_trait;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::{decode_request, ErrorReply, FallbackReply, NetworkError, Result, WireRequest, MAX_MESSAGE_BYTES};

/// Service logic plugged into [`Server`].
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    type Request: WireRequest + Send;
    type Response: Serialize + Send;

    async fn handle(&self, request: Self::Request, peer: SocketAddr) -> Self::Response;
}

/// Accept loop serving one request per connection.
pub struct Server<H> {
    listener: TcpListener,
    handler: Arc<H>,
    connection_limit: Option<Arc<Semaphore>>,
    io_timeout: Duration,
}

impl<H: RequestHandler> Server<H> {
    pub async fn bind(addr: SocketAddr, handler: H) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| NetworkError::ConnectionFailed(format!("Failed to bind to {}: {}", addr, e)))?;
        Ok(Self::from_listener(listener, handler))
    }

    pub fn from_listener(listener: TcpListener, handler: H) -> Self {
        Self {
            listener,
            handler: Arc::new(handler),
            connection_limit: None,
            io_timeout: Duration::from_secs(30),
        }
    }

    /// Caps the number of connections serviced at once. Further
    /// connections wait in the accept backlog.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.connection_limit = Some(Arc::new(Semaphore::new(max.max(1))));
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handler(&self) -> Arc<H> {
        self.handler.clone()
    }

    pub async fn run(self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        loop {
            let permit = match &self.connection_limit {
                Some(limit) => Some(
                    limit
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|_| NetworkError::Protocol("Connection limiter closed".to_string()))?,
                ),
                None => None,
            };

            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let handler = self.handler.clone();
            let io_timeout = self.io_timeout;
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, peer, handler, io_timeout).await {
                    tracing::warn!("Connection from {} failed: {}", peer, e);
                }
                drop(permit);
            });
        }
    }
}

async fn serve_connection<H: RequestHandler>(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<H>,
    io_timeout: Duration,
) -> Result<()> {
    let mut raw = Vec::new();
    let read = tokio::time::timeout(
        io_timeout,
        (&mut stream).take(MAX_MESSAGE_BYTES + 1).read_to_end(&mut raw),
    )
    .await;

    let reply = match read {
        Err(_) => encode(&FallbackReply::Error(ErrorReply::protocol("timed out waiting for request")))?,
        Ok(Err(e)) => return Err(e.into()),
        Ok(Ok(_)) if raw.len() as u64 > MAX_MESSAGE_BYTES => {
            encode(&FallbackReply::Error(ErrorReply::protocol("request too large")))?
        }
        Ok(Ok(_)) => match decode_request::<H::Request>(&raw) {
            Ok(request) => encode(&handler.handle(request, peer).await)?,
            Err(reply) => {
                tracing::debug!("Rejected request from {}: {}", peer, reply.error);
                encode(&FallbackReply::Error(reply))?
            }
        },
    };

    stream.write_all(&reply).await?;
    stream.shutdown().await?;
    Ok(())
}

fn encode<T: Serialize>(reply: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(reply)?)
}
