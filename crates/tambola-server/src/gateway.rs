//! Event Gateway: intents in, events out.
//!
//! The gateway owns the boundary between the wire and the session tasks. It
//! keeps one subscription record per connection (which player, which
//! session, which outbound channel), routes each inbound intent through the
//! registry to the right session task, and returns failures as unicast
//! error messages on the originating connection only. Teardown is
//! deterministic in both directions: a disconnect surfaces to the session
//! as a `disconnect` command, and a kick recorded by the session task marks
//! the target's handle detached so the gateway drops the stale membership
//! on its next interaction instead of replaying a departure.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tambola_core::{GameError, PlayerId, SessionId};
use tambola_proto::{ClientIntent, ServerMessage};
use tokio::sync::{mpsc, oneshot};

use crate::{
    registry::SessionRegistry,
    session_task::{Reply, SessionCommand},
};

/// Outbound side of one connection.
///
/// Session tasks hold clones of this to broadcast events. The relation is
/// weak: if the connection is gone, sends are dropped with a debug log and
/// nothing blocks or fails upstream.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    conn_id: u64,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    detached: Arc<AtomicBool>,
}

impl ConnectionHandle {
    /// Wrap a connection's outbound channel.
    pub fn new(conn_id: u64, outbound: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { conn_id, outbound, detached: Arc::new(AtomicBool::new(false)) }
    }

    /// Runtime-assigned connection id.
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    /// Fire-and-forget send.
    pub fn send(&self, msg: ServerMessage) {
        if self.outbound.send(msg).is_err() {
            tracing::debug!(conn = self.conn_id, "dropped message to closed connection");
        }
    }

    /// Record that the session side removed this connection (kick).
    ///
    /// The gateway observes the marker on its next interaction with the
    /// connection and clears the stale membership.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    /// Consume a pending detach marker.
    fn take_detached(&self) -> bool {
        self.detached.swap(false, Ordering::AcqRel)
    }
}

/// Per-connection subscription record.
#[derive(Debug)]
pub struct ConnectionCtx {
    handle: ConnectionHandle,
    membership: Option<(SessionId, PlayerId)>,
}

impl ConnectionCtx {
    /// Fresh record for a newly accepted connection.
    pub fn new(handle: ConnectionHandle) -> Self {
        Self { handle, membership: None }
    }

    /// The connection's outbound handle.
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// The session/player this connection is subscribed to, if any.
    pub fn membership(&self) -> Option<(SessionId, PlayerId)> {
        self.membership
    }

    /// Apply a detach the session side recorded since the last interaction.
    fn reconcile(&mut self) {
        if self.handle.take_detached() {
            self.membership = None;
        }
    }
}

/// Routes intents from connections to session tasks.
#[derive(Debug, Clone)]
pub struct Gateway {
    registry: Arc<SessionRegistry>,
}

impl Gateway {
    /// Gateway over a session registry.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Apply one inbound intent for a connection.
    pub async fn handle_intent(&self, ctx: &mut ConnectionCtx, intent: ClientIntent) {
        ctx.reconcile();
        match intent {
            ClientIntent::Create { host_id, host_name } => {
                self.leave_current(ctx).await;
                let session_id = self.registry.create(host_id, &host_name).await;
                ctx.handle.send(ServerMessage::Created { session_id });
                self.join_session(ctx, session_id, host_id, host_name).await;
            },

            ClientIntent::Join { session_id, player_id, player_name } => {
                self.leave_current(ctx).await;
                self.join_session(ctx, session_id, player_id, player_name).await;
            },

            ClientIntent::Leave { session_id, player_id } => {
                let ok = self
                    .request(ctx, session_id, |reply| SessionCommand::Leave {
                        player: player_id,
                        reply,
                    })
                    .await;
                if ok {
                    ctx.membership = None;
                }
            },

            ClientIntent::Kick { session_id, requester_id, target_id } => {
                self.request(ctx, session_id, |reply| SessionCommand::Kick {
                    requester: requester_id,
                    target: target_id,
                    reply,
                })
                .await;
            },

            ClientIntent::Start { session_id, requester_id } => {
                self.request(ctx, session_id, |reply| SessionCommand::Start {
                    requester: requester_id,
                    reply,
                })
                .await;
            },

            ClientIntent::Draw { session_id, requester_id } => {
                self.request(ctx, session_id, |reply| SessionCommand::Draw {
                    requester: requester_id,
                    reply,
                })
                .await;
            },

            ClientIntent::Claim { session_id, player_id, pattern } => {
                self.request(ctx, session_id, |reply| SessionCommand::Claim {
                    player: player_id,
                    pattern,
                    reply,
                })
                .await;
            },

            ClientIntent::End { session_id, requester_id } => {
                self.request(ctx, session_id, |reply| SessionCommand::End {
                    requester: requester_id,
                    reply,
                })
                .await;
            },
        }
    }

    /// Tear down a connection's subscription on disconnect.
    ///
    /// Disconnection surfaces to the session as a `disconnect` command;
    /// there is no reply channel because nobody is listening for the
    /// outcome. A connection whose handle was detached by a kick has no
    /// membership left to surface.
    pub async fn handle_disconnect(&self, ctx: &mut ConnectionCtx) {
        ctx.reconcile();
        if let Some((session_id, player_id)) = ctx.membership.take() {
            tracing::debug!(conn = ctx.handle.conn_id(), session = %session_id, "connection detached");
            if let Ok(handle) = self.registry.get(session_id).await {
                let _ = handle.send(SessionCommand::Disconnect { player: player_id });
            }
        }
    }

    /// Join a session and record the subscription on success.
    async fn join_session(
        &self,
        ctx: &mut ConnectionCtx,
        session_id: SessionId,
        player_id: PlayerId,
        player_name: String,
    ) {
        let conn = ctx.handle.clone();
        let ok = self
            .request(ctx, session_id, move |reply| SessionCommand::Join {
                player: player_id,
                name: player_name,
                conn,
                reply,
            })
            .await;
        if ok {
            ctx.membership = Some((session_id, player_id));
        }
    }

    /// A connection switching sessions implicitly leaves its old one.
    async fn leave_current(&self, ctx: &mut ConnectionCtx) {
        self.handle_disconnect(ctx).await;
    }

    /// Route one command and unicast any failure back to the requester.
    ///
    /// Returns whether the command succeeded.
    async fn request(
        &self,
        ctx: &ConnectionCtx,
        session_id: SessionId,
        make: impl FnOnce(Reply) -> SessionCommand,
    ) -> bool {
        let handle = match self.registry.get(session_id).await {
            Ok(handle) => handle,
            Err(e) => {
                ctx.handle.send(ServerMessage::from_error(&e));
                return false;
            },
        };

        let (tx, rx) = oneshot::channel();
        if let Err(e) = handle.send(make(tx)) {
            ctx.handle.send(ServerMessage::from_error(&e));
            return false;
        }

        match rx.await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                ctx.handle.send(ServerMessage::from_error(&e));
                false
            },
            // Task stopped before answering: the session ended first.
            Err(_) => {
                ctx.handle
                    .send(ServerMessage::from_error(&GameError::SessionNotFound(session_id)));
                false
            },
        }
    }
}
