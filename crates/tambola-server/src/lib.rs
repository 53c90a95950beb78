//! Tambola session server.
//!
//! Production runtime wrapping [`tambola_core`]'s action-based session
//! logic with real I/O. Game operations live in the core crate and return
//! action lists; this crate executes them: one Tokio task per session
//! serializes all of that session's intents ([`session_task`]), the
//! registry maps session ids to running tasks, and the [`Gateway`] routes
//! intents from connections to tasks and failures back as unicast errors.
//!
//! Transport is newline-delimited JSON over TCP. Each connection gets a
//! reader loop (parse intent, hand to gateway) and a writer task draining
//! an unbounded channel, so slow readers never block a session.
//!
//! # Components
//!
//! - [`Gateway`]: intent routing and per-connection subscription state
//! - [`SessionRegistry`]: table of live session tasks
//! - [`TcpTransport`]: listener for client connections
//! - [`Server`]: accept loop tying the pieces together

mod error;
mod gateway;
mod registry;
pub mod session_task;
mod transport;

use std::sync::{
    Arc,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

pub use error::ServerError;
pub use gateway::{ConnectionCtx, ConnectionHandle, Gateway};
pub use registry::{SessionHandle, SessionRegistry};
use tambola_proto::{ClientIntent, ErrorKind, ServerMessage};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter},
    net::{TcpStream, tcp::OwnedWriteHalf},
    sync::mpsc,
};
pub use transport::TcpTransport;

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:7400")
    pub bind_address: String,
    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:7400".to_string(), max_connections: 10_000 }
    }
}

/// Production Tambola server.
///
/// Accepts TCP connections and routes their intents through the gateway.
pub struct Server {
    transport: TcpTransport,
    gateway: Gateway,
    max_connections: usize,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the bind address is invalid or the
    /// listener cannot be created.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let transport = TcpTransport::bind(&config.bind_address).await?;
        let gateway = Gateway::new(SessionRegistry::new());

        Ok(Self { transport, gateway, max_connections: config.max_connections })
    }

    /// Run the server, accepting connections and processing intents.
    ///
    /// Runs until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if accepting fails.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server listening on {}", self.transport.local_addr()?);

        let next_conn_id = AtomicU64::new(1);
        let active = Arc::new(AtomicUsize::new(0));

        loop {
            let (stream, peer) = self.transport.accept().await?;

            if active.load(Ordering::Acquire) >= self.max_connections {
                tracing::warn!(%peer, "connection limit reached, refusing");
                drop(stream);
                continue;
            }

            let conn_id = next_conn_id.fetch_add(1, Ordering::Relaxed);
            let gateway = self.gateway.clone();
            let active = Arc::clone(&active);
            active.fetch_add(1, Ordering::AcqRel);

            tokio::spawn(async move {
                tracing::debug!(conn = conn_id, %peer, "connection accepted");
                handle_connection(conn_id, stream, gateway).await;
                active.fetch_sub(1, Ordering::AcqRel);
                tracing::debug!(conn = conn_id, %peer, "connection closed");
            });
        }
    }

    /// Local address the server is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if the socket address cannot be
    /// read back.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Drive one connection to completion.
///
/// Reads intents line by line and applies them through the gateway. A
/// malformed line gets a `bad-request` error reply; the connection stays
/// open. On EOF or read error the gateway tears down the subscription,
/// which surfaces to the session as a disconnect.
async fn handle_connection(conn_id: u64, stream: TcpStream, gateway: Gateway) {
    let (read_half, write_half) = stream.into_split();

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_outbound(conn_id, write_half, outbound_rx));

    let mut ctx = ConnectionCtx::new(ConnectionHandle::new(conn_id, outbound_tx));
    let mut lines = BufReader::new(read_half).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClientIntent>(&line) {
                    Ok(intent) => gateway.handle_intent(&mut ctx, intent).await,
                    Err(e) => {
                        tracing::debug!(conn = conn_id, "unparseable intent: {}", e);
                        ctx.handle().send(ServerMessage::Error {
                            kind: ErrorKind::BadRequest,
                            message: format!("unparseable intent: {e}"),
                        });
                    },
                }
            },
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(conn = conn_id, "read error: {}", e);
                break;
            },
        }
    }

    gateway.handle_disconnect(&mut ctx).await;
    // Dropping the context releases the outbound sender; the writer task
    // drains what is queued and exits.
    drop(ctx);
    let _ = writer.await;
}

/// Drain the outbound channel onto the socket, one JSON line per message.
async fn write_outbound(
    conn_id: u64,
    write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
) {
    let mut writer = BufWriter::new(write_half);

    while let Some(msg) = outbound.recv().await {
        let mut line = match serde_json::to_vec(&msg) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(conn = conn_id, "failed to serialize message: {}", e);
                continue;
            },
        };
        line.push(b'\n');

        if let Err(e) = writer.write_all(&line).await {
            tracing::debug!(conn = conn_id, "write failed: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            tracing::debug!(conn = conn_id, "flush failed: {}", e);
            break;
        }
    }
}
