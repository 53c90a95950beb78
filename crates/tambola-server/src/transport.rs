//! TCP transport carrying newline-delimited JSON.
//!
//! Each client connection is one TCP stream. Messages travel as one JSON
//! object per line: intents inbound, events and error replies outbound.
//! Framing is handled by the connection loop in the crate root; this module
//! only owns the listener.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::error::ServerError;

/// TCP listener for client connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Create and bind a new TCP transport.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for an unparseable address and
    /// [`ServerError::Transport`] if binding fails.
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        tracing::info!("TCP transport bound to {}", addr);

        Ok(Self { listener })
    }

    /// Accept a new connection.
    ///
    /// Blocks until a connection is available.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if the accept fails.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        self.listener
            .accept()
            .await
            .map_err(|e| ServerError::Transport(format!("accept failed: {e}")))
    }

    /// Local address the transport is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if the socket address cannot be
    /// read back.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("failed to get local address: {e}")))
    }
}
