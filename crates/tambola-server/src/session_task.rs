//! One task per session: the serialization discipline.
//!
//! Each session's coordinator is owned by exactly one Tokio task. Intents
//! arrive as [`SessionCommand`]s on the task's channel and are applied
//! strictly in arrival order, so every coordinator operation is a critical
//! section without any locking: of two racing claims for the same pattern,
//! whichever command is dequeued first wins and the second observes
//! `DuplicateClaim`. Different sessions run as independent tasks and never
//! share mutable state.
//!
//! Outbound events are dispatched fire-and-forget to member connections; a
//! dead connection drops its messages without blocking the session.

use std::{collections::HashMap, sync::Arc};

use rand::rngs::StdRng;
use tambola_core::{
    ClaimPattern, GameError, PlayerId, SessionAction, SessionCoordinator, SessionId, SessionStatus,
};
use tambola_proto::ServerMessage;
use tokio::sync::{mpsc, oneshot};

use crate::{gateway::ConnectionHandle, registry::SessionRegistry};

/// Response channel for one command.
pub type Reply = oneshot::Sender<Result<(), GameError>>;

/// A player intent routed to a session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Join or rejoin, attaching the player's connection for broadcasts.
    Join {
        /// Joining player.
        player: PlayerId,
        /// Display name.
        name: String,
        /// Connection to receive this session's events.
        conn: ConnectionHandle,
        /// Outcome channel.
        reply: Reply,
    },
    /// Leave on the player's explicit request.
    Leave {
        /// Leaving player.
        player: PlayerId,
        /// Outcome channel.
        reply: Reply,
    },
    /// Connection dropped; the player may rejoin later. No reply channel
    /// because nobody is listening for the outcome.
    Disconnect {
        /// Player whose connection went away.
        player: PlayerId,
    },
    /// Kick a player (host only).
    Kick {
        /// Requesting player.
        requester: PlayerId,
        /// Player to remove.
        target: PlayerId,
        /// Outcome channel.
        reply: Reply,
    },
    /// Start the game (host only).
    Start {
        /// Requesting player.
        requester: PlayerId,
        /// Outcome channel.
        reply: Reply,
    },
    /// Draw the next number (host only).
    Draw {
        /// Requesting player.
        requester: PlayerId,
        /// Outcome channel.
        reply: Reply,
    },
    /// Claim a pattern.
    Claim {
        /// Claiming player.
        player: PlayerId,
        /// Pattern claimed.
        pattern: ClaimPattern,
        /// Outcome channel.
        reply: Reply,
    },
    /// End the session (host only).
    End {
        /// Requesting player.
        requester: PlayerId,
        /// Outcome channel.
        reply: Reply,
    },
}

/// Run one session to completion.
///
/// Exits when the session reaches `Ended` (after flushing terminal events
/// and failing any queued commands) or when every handle to the command
/// channel is gone.
pub(crate) async fn run(
    id: SessionId,
    mut coordinator: SessionCoordinator<StdRng>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    registry: Arc<SessionRegistry>,
) {
    let mut members: HashMap<PlayerId, ConnectionHandle> = HashMap::new();

    while let Some(command) = commands.recv().await {
        apply(id, &mut coordinator, &mut members, command);

        if coordinator.session().status() == SessionStatus::Ended {
            registry.remove(id).await;
            commands.close();
            // Commands already queued lose the race with termination.
            while let Some(late) = commands.recv().await {
                refuse(late);
            }
            break;
        }
    }

    tracing::debug!(session = %id, "session task stopped");
}

/// Apply one command to the coordinator and dispatch its actions.
fn apply(
    id: SessionId,
    coordinator: &mut SessionCoordinator<StdRng>,
    members: &mut HashMap<PlayerId, ConnectionHandle>,
    command: SessionCommand,
) {
    match command {
        SessionCommand::Join { player, name, conn, reply } => {
            match coordinator.join(player, &name) {
                Ok(actions) => {
                    members.insert(player, conn);
                    dispatch(id, actions, members);
                    let _ = reply.send(Ok(()));
                },
                Err(e) => {
                    let _ = reply.send(Err(e));
                },
            }
        },
        SessionCommand::Leave { player, reply } => match coordinator.leave(player) {
            Ok(actions) => {
                dispatch(id, actions, members);
                members.remove(&player);
                let _ = reply.send(Ok(()));
            },
            Err(e) => {
                let _ = reply.send(Err(e));
            },
        },
        SessionCommand::Disconnect { player } => match coordinator.disconnect(player) {
            Ok(actions) => {
                dispatch(id, actions, members);
                members.remove(&player);
            },
            Err(e) => {
                tracing::debug!(session = %id, player = %player, error = %e, "stale disconnect");
            },
        },
        SessionCommand::Kick { requester, target, reply } => {
            respond(reply, coordinator.kick(requester, target), id, members);
        },
        SessionCommand::Start { requester, reply } => {
            respond(reply, coordinator.start(requester), id, members);
        },
        SessionCommand::Draw { requester, reply } => {
            respond(reply, coordinator.draw_next(requester), id, members);
        },
        SessionCommand::Claim { player, pattern, reply } => {
            respond(reply, coordinator.submit_claim(player, pattern), id, members);
        },
        SessionCommand::End { requester, reply } => {
            respond(reply, coordinator.end(requester), id, members);
        },
    }
}

/// Dispatch actions on success, forward the outcome either way.
fn respond(
    reply: Reply,
    result: Result<Vec<SessionAction>, GameError>,
    id: SessionId,
    members: &mut HashMap<PlayerId, ConnectionHandle>,
) {
    match result {
        Ok(actions) => {
            dispatch(id, actions, members);
            let _ = reply.send(Ok(()));
        },
        Err(e) => {
            let _ = reply.send(Err(e));
        },
    }
}

/// Execute coordinator actions against the member connections.
fn dispatch(
    id: SessionId,
    actions: Vec<SessionAction>,
    members: &mut HashMap<PlayerId, ConnectionHandle>,
) {
    for action in actions {
        match action {
            SessionAction::Broadcast(envelope) => {
                let msg = ServerMessage::from_envelope(id, envelope);
                for conn in members.values() {
                    conn.send(msg.clone());
                }
            },
            SessionAction::ToPlayer { player, event } => {
                if let Some(conn) = members.get(&player) {
                    conn.send(ServerMessage::from_direct(id, event));
                }
            },
            SessionAction::Detach { player } => {
                // Mark the handle so the gateway drops the connection's
                // stale membership instead of replaying a departure.
                if let Some(conn) = members.remove(&player) {
                    conn.detach();
                }
            },
        }
    }
}

/// Fail a command that arrived after the session ended.
fn refuse(command: SessionCommand) {
    let reply = match command {
        SessionCommand::Join { reply, .. }
        | SessionCommand::Leave { reply, .. }
        | SessionCommand::Kick { reply, .. }
        | SessionCommand::Start { reply, .. }
        | SessionCommand::Draw { reply, .. }
        | SessionCommand::Claim { reply, .. }
        | SessionCommand::End { reply, .. } => Some(reply),
        SessionCommand::Disconnect { .. } => None,
    };
    if let Some(reply) = reply {
        let _ = reply.send(Err(GameError::AlreadyEnded));
    }
}
