//! WebSocket connections upgraded on the REST port (`GET /ws`).
//!
//! The browser client opens its socket on the same host and port it uses
//! for REST. axum performs the upgrade; [`UpgradedConnection`] then adapts
//! the socket to the [`Connection`] trait so the same handler serves both
//! this route and the dedicated WebSocket listener.

use std::io;

use axum::extract::ws::{Message, WebSocket};
use connectfour_transport::{Connection, ConnectionId, TransportError};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;

/// A WebSocket accepted through axum's `WebSocketUpgrade`.
///
/// Split like the listener-side connection: a task blocked in `recv`
/// never holds up outbound updates.
pub(crate) struct UpgradedConnection {
    id: ConnectionId,
    request_target: String,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
}

impl UpgradedConnection {
    pub(crate) fn new(socket: WebSocket, request_target: String) -> Self {
        let id = ConnectionId::next();
        tracing::debug!(%id, target = %request_target, "upgraded WebSocket on REST port");
        let (sink, stream) = socket.split();
        Self {
            id,
            request_target,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

impl Connection for UpgradedConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn request_target(&self) -> &str {
        &self.request_target
    }
}
