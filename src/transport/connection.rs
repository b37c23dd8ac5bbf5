//! WebSocket connection and I/O loop.
//!
//! This module handles one WebSocket link to the race server. Each
//! [`Connection`] spawns a tokio task that:
//!
//! - Connects to the endpoint (bounded by the connect timeout)
//! - Forwards every inbound text frame as a [`LinkEvent::Frame`]
//! - Writes outbound frames queued through [`Connection::send`]
//! - Reports exactly one [`LinkEvent::Closed`] when the link ends
//!
//! The task never interprets frames; decoding and state changes happen on
//! the engine task, in arrival order.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::ClientMessage;

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// LinkEvent
// ============================================================================

/// Lifecycle and data notifications from a connection's I/O task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The WebSocket handshake completed.
    Opened(ConnectionId),

    /// One inbound text frame.
    Frame(ConnectionId, String),

    /// The link ended (connect failure, remote close, error or shutdown).
    Closed {
        /// Connection that ended.
        id: ConnectionId,
        /// Failure description, `None` for a clean close.
        reason: Option<String>,
    },
}

impl LinkEvent {
    /// Returns the connection this event belongs to.
    #[inline]
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            Self::Opened(id) | Self::Frame(id, _) | Self::Closed { id, .. } => *id,
        }
    }
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the I/O loop.
enum ConnectionCommand {
    /// Write a serialized frame.
    Send(String),
    /// Close the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to one WebSocket link.
///
/// Dropping every clone of the handle closes the link.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Generation of this link.
    id: ConnectionId,
    /// Channel for sending commands to the I/O loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl Connection {
    /// Starts connecting to `url` in a background task.
    ///
    /// Returns immediately. Progress arrives on `events`: [`LinkEvent::Opened`]
    /// once the handshake completes, then frames, then one
    /// [`LinkEvent::Closed`]. A failed connect produces only `Closed`.
    pub fn open(
        url: impl Into<String>,
        connect_timeout: Duration,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Self {
        let id = ConnectionId::next();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(Self::run(
            id,
            url.into(),
            connect_timeout,
            command_rx,
            events,
        ));

        Self { id, command_tx }
    }

    /// Returns the generation id of this link.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a command for sending.
    ///
    /// Fire-and-forget: success means the frame was queued, not delivered.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if serialization fails
    /// - [`Error::ConnectionClosed`] if the I/O loop has stopped
    pub fn send(&self, message: &ClientMessage) -> Result<()> {
        let frame = message.to_frame()?;
        self.command_tx
            .send(ConnectionCommand::Send(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Closes the connection gracefully.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Task body: connect, run the I/O loop, report the close.
    async fn run(
        id: ConnectionId,
        url: String,
        connect_timeout: Duration,
        command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) {
        debug!(%id, %url, "Connecting");

        let reason = match Self::connect(&url, connect_timeout).await {
            Ok(ws_stream) => {
                debug!(%id, "WebSocket connection established");
                if events.send(LinkEvent::Opened(id)).is_err() {
                    // Nobody is listening; close right away.
                    return;
                }
                Self::run_io_loop(id, ws_stream, command_rx, &events).await
            }
            Err(e) => {
                debug!(%id, error = %e, "Connect failed");
                Some(e.to_string())
            }
        };

        let _ = events.send(LinkEvent::Closed { id, reason });
    }

    /// Opens the WebSocket, bounded by `connect_timeout`.
    async fn connect(url: &str, connect_timeout: Duration) -> Result<WsStream> {
        let (ws_stream, _response) = timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))??;
        Ok(ws_stream)
    }

    /// I/O loop. Returns the failure reason, `None` for a clean close.
    async fn run_io_loop(
        id: ConnectionId,
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        events: &mpsc::UnboundedSender<LinkEvent>,
    ) -> Option<String> {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from the server
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(%id, len = text.len(), "Frame received");
                            if events.send(LinkEvent::Frame(id, text.as_str().to_owned())).is_err() {
                                let _ = ws_write.close().await;
                                return None;
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!(%id, "WebSocket closed by remote");
                            return None;
                        }

                        Some(Err(e)) => {
                            warn!(%id, error = %e, "WebSocket error");
                            return Some(e.to_string());
                        }

                        None => {
                            debug!(%id, "WebSocket stream ended");
                            return None;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the engine
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(frame)) => {
                            if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                                warn!(%id, error = %e, "Failed to send frame");
                                return Some(e.to_string());
                            }
                            trace!(%id, "Frame sent");
                        }

                        Some(ConnectionCommand::Shutdown) | None => {
                            debug!(%id, "Shutdown requested");
                            let _ = ws_write.close().await;
                            return None;
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::ControllerId;
    use crate::transport::server::{MockServer, WAIT_TIMEOUT};

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<LinkEvent>) -> LinkEvent {
        timeout(WAIT_TIMEOUT, rx.recv())
            .await
            .expect("event in time")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_frames_both_directions() {
        let server = MockServer::bind().await.expect("bind");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = Connection::open(server.ws_url(), WAIT_TIMEOUT, tx);
        let id = connection.id();

        let mut peer = server.accept().await.expect("accept");
        assert_eq!(next_event(&mut rx).await, LinkEvent::Opened(id));

        peer.send(r#"{"type":"laps_update","laps":4}"#)
            .await
            .expect("send");
        assert_eq!(
            next_event(&mut rx).await,
            LinkEvent::Frame(id, r#"{"type":"laps_update","laps":4}"#.to_string())
        );

        let slot = ControllerId::new(1).expect("slot");
        connection
            .send(&ClientMessage::bind_car(slot))
            .expect("queued");
        let reply = peer.recv().await.expect("recv");
        assert_eq!(reply.as_deref(), Some(r#"{"type":"bind_car","id":1}"#));

        peer.close().await.expect("close");
        assert_eq!(
            next_event(&mut rx).await,
            LinkEvent::Closed { id, reason: None }
        );
    }

    #[tokio::test]
    async fn test_frames_keep_arrival_order() {
        let server = MockServer::bind().await.expect("bind");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = Connection::open(server.ws_url(), WAIT_TIMEOUT, tx);

        let mut peer = server.accept().await.expect("accept");
        assert!(matches!(next_event(&mut rx).await, LinkEvent::Opened(_)));

        for number in [4, 3, 2, 1, 0] {
            peer.send(&format!(r#"{{"type":"countdown","number":{number}}}"#))
                .await
                .expect("send");
        }

        for number in [4, 3, 2, 1, 0] {
            let expected = format!(r#"{{"type":"countdown","number":{number}}}"#);
            assert_eq!(
                next_event(&mut rx).await,
                LinkEvent::Frame(connection.id(), expected)
            );
        }
    }

    #[tokio::test]
    async fn test_refused_connect_reports_closed() {
        let server = MockServer::bind().await.expect("bind");
        let url = server.ws_url();
        drop(server);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = Connection::open(url, WAIT_TIMEOUT, tx);

        match next_event(&mut rx).await {
            LinkEvent::Closed { id, reason } => {
                assert_eq!(id, connection.id());
                assert!(reason.is_some());
            }
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_closes_link() {
        let server = MockServer::bind().await.expect("bind");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = Connection::open(server.ws_url(), WAIT_TIMEOUT, tx);

        let mut peer = server.accept().await.expect("accept");
        assert!(matches!(next_event(&mut rx).await, LinkEvent::Opened(_)));

        connection.shutdown();
        assert_eq!(
            next_event(&mut rx).await,
            LinkEvent::Closed {
                id: connection.id(),
                reason: None
            }
        );
        assert_eq!(peer.recv().await.expect("recv"), None);
        assert!(connection.send(&ClientMessage::play_sound("x.wav")).is_err());
    }

    #[test]
    fn test_link_event_connection_id() {
        let id = ConnectionId::next();
        assert_eq!(LinkEvent::Opened(id).connection_id(), id);
        assert_eq!(LinkEvent::Frame(id, String::new()).connection_id(), id);
        assert_eq!(LinkEvent::Closed { id, reason: None }.connection_id(), id);
    }
}
