use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::{NetworkError, Result, MAX_MESSAGE_BYTES};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends one request over a fresh connection and waits for the reply.
///
/// The write half is shut down after the request so the server sees EOF;
/// the reply is read until the server closes. The whole exchange is
/// bounded by `deadline`.
pub async fn send_request<Req, Resp>(addr: SocketAddr, request: &Req, deadline: Duration) -> Result<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let payload = serde_json::to_vec(request)?;

    let exchange = async {
        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|e| NetworkError::ConnectionFailed(format!("{}: {}", addr, e)))?;

        stream.write_all(&payload).await?;
        stream.shutdown().await?;

        let mut reply = Vec::new();
        (&mut stream)
            .take(MAX_MESSAGE_BYTES + 1)
            .read_to_end(&mut reply)
            .await?;

        if reply.len() as u64 > MAX_MESSAGE_BYTES {
            return Err(NetworkError::MessageTooLarge);
        }
        if reply.is_empty() {
            return Err(NetworkError::Protocol(format!("{} closed without replying", addr)));
        }

        Ok::<_, NetworkError>(reply)
    };

    let reply = tokio::time::timeout(deadline, exchange)
        .await
        .map_err(|_| NetworkError::Timeout(format!("no reply from {} within {:?}", addr, deadline)))??;

    tracing::trace!("Received {} byte reply from {}", reply.len(), addr);

    Ok(serde_json::from_slice(&reply)?)
}
