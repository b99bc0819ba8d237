//! Request/reply transport: one fresh ZeroMQ REQ channel per call.

use std::time::Duration;

use {
    async_trait::async_trait,
    bytes::Bytes,
    chainball_protocol::{ReplyFrame, RequestFrame},
    tracing::{debug, trace, warn},
    zeromq::{ReqSocket, Socket, SocketRecv, SocketSend, ZmqMessage},
};

use crate::error::{Error, Result};

/// A request/reply channel factory.
///
/// Each `round_trip` must use a channel of its own and release it before
/// returning, whatever the outcome.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Send one encoded request and return the raw reply frames.
    ///
    /// Fails with [`Error::Transport`] on send/receive faults and with
    /// [`Error::Timeout`] when no reply arrives within `timeout`.
    async fn round_trip(&self, request: Vec<u8>, timeout: Duration) -> Result<Vec<Bytes>>;
}

/// ZeroMQ REQ transport to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct ZmqTransport {
    endpoint: String,
}

impl ZmqTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn converse(&self, socket: &mut ReqSocket, request: Vec<u8>) -> Result<Vec<Bytes>> {
        socket
            .connect(&self.endpoint)
            .await
            .map_err(|e| Error::transport("could not connect to server", e))?;
        socket
            .send(ZmqMessage::from(request))
            .await
            .map_err(|e| Error::transport("could not call server", e))?;
        let reply = socket
            .recv()
            .await
            .map_err(|e| Error::transport("could not receive data from server", e))?;
        Ok(reply.into_vec())
    }
}

#[async_trait]
impl RequestTransport for ZmqTransport {
    async fn round_trip(&self, request: Vec<u8>, timeout: Duration) -> Result<Vec<Bytes>> {
        let mut socket = ReqSocket::new();
        let outcome = tokio::time::timeout(timeout, self.converse(&mut socket, request)).await;

        // Released on every path so a stuck exchange never leaks into the next.
        let close_errors = socket.close().await;
        if !close_errors.is_empty() {
            debug!(
                endpoint = %self.endpoint,
                errors = close_errors.len(),
                "errors while closing request channel"
            );
        }

        match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }
}

/// Perform one call: encode, round trip, decode, classify.
pub async fn exchange(
    transport: &dyn RequestTransport,
    request: &RequestFrame,
    timeout: Duration,
) -> Result<serde_json::Value> {
    let encoded = request.to_bytes()?;
    trace!(call = %request.call, bytes = encoded.len(), "gateway -> scoreboard");

    let frames = transport.round_trip(encoded, timeout).await?;
    let reply = ReplyFrame::from_frames(&frames)?;
    trace!(call = %request.call, status = %reply.status, "scoreboard -> gateway");

    if !reply.is_ok() {
        warn!(call = %request.call, status = %reply.status, "scoreboard rejected call");
        return Err(Error::remote(reply.payload));
    }
    Ok(reply.payload)
}
