//! Local race-server stand-in for tests.
//!
//! [`MockServer`] binds a WebSocket listener on `127.0.0.1` with an
//! OS-assigned port. Each accepted client becomes a [`MockPeer`] that can
//! push server frames and read client commands.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for any single wait in a test.
pub(crate) const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// MockServer
// ============================================================================

/// A bound listener waiting for clients.
pub(crate) struct MockServer {
    listener: TcpListener,
    port: u16,
}

impl MockServer {
    /// Binds to `127.0.0.1:0`.
    pub(crate) async fn bind() -> Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        debug!(port, "Mock race server bound");

        Ok(Self { listener, port })
    }

    /// Returns the port the server is bound to.
    pub(crate) const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the endpoint clients should connect to.
    pub(crate) fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/sclx", self.port)
    }

    /// Accepts the next client and completes the WebSocket upgrade.
    pub(crate) async fn accept(&self) -> Result<MockPeer> {
        let (stream, addr) = timeout(WAIT_TIMEOUT, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(WAIT_TIMEOUT.as_millis() as u64))??;

        debug!(?addr, "Mock server accepted client");

        let ws = accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        Ok(MockPeer { ws })
    }
}

// ============================================================================
// MockPeer
// ============================================================================

/// Server side of one accepted client.
pub(crate) struct MockPeer {
    ws: WebSocketStream<TcpStream>,
}

impl MockPeer {
    /// Pushes one text frame.
    pub(crate) async fn send(&mut self, frame: &str) -> Result<()> {
        self.ws.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    /// Pushes a JSON value as one frame.
    pub(crate) async fn send_json(&mut self, value: serde_json::Value) -> Result<()> {
        self.send(&value.to_string()).await
    }

    /// Waits for the next text frame from the client.
    ///
    /// Returns `None` if the client closed the link.
    pub(crate) async fn recv(&mut self) -> Result<Option<String>> {
        loop {
            let message = timeout(WAIT_TIMEOUT, self.ws.next())
                .await
                .map_err(|_| Error::connection_timeout(WAIT_TIMEOUT.as_millis() as u64))?;

            match message {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Waits for the next frame and parses it as JSON.
    pub(crate) async fn recv_json(&mut self) -> Result<serde_json::Value> {
        let text = self.recv().await?.ok_or(Error::ConnectionClosed)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Closes the link from the server side.
    pub(crate) async fn close(mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_random_port() {
        let server = MockServer::bind().await.expect("bind should succeed");

        assert!(server.port() > 0);
        assert_eq!(
            server.ws_url(),
            format!("ws://127.0.0.1:{}/sclx", server.port())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_without_client_times_out() {
        let server = MockServer::bind().await.expect("bind should succeed");

        let result = server.accept().await;
        assert!(matches!(result, Err(Error::ConnectionTimeout { .. })));
    }
}
