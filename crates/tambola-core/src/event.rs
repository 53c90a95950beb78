//! Outbound actions produced by the coordinator.
//!
//! The coordinator never touches the network. Every operation returns
//! [`SessionAction`]s and the runtime executes them: broadcasts fan out to
//! all current members, direct events go to one player, `Detach` tells the
//! gateway to drop a kicked player's subscription.
//!
//! Broadcast events are wrapped in an [`Envelope`] carrying a monotonically
//! increasing per-session sequence number. A reconnecting client compares
//! the next envelope's `seq` against the `last_seq` of its snapshot to
//! detect gaps and re-request full state.

use serde::{Deserialize, Serialize};

use crate::{
    claim::ClaimPattern,
    session::{ClaimRecord, GameSession, PlayerId, PlayerStatus, SessionId, SessionStatus},
    ticket::Ticket,
};

/// A broadcast event with its per-session sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Monotonic per-session sequence number, starting at 0.
    pub seq: u64,
    /// The event itself.
    pub event: SessionEvent,
}

/// Events broadcast to every member of a session, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// A player joined or rejoined; carries the updated roster.
    PlayerJoined {
        /// Who joined.
        player: PlayerId,
        /// Roster after the change.
        roster: Vec<RosterEntry>,
    },

    /// A player left, disconnected, or was kicked; carries the updated
    /// roster.
    PlayerLeft {
        /// Who left.
        player: PlayerId,
        /// Roster after the change.
        roster: Vec<RosterEntry>,
    },

    /// The host role moved to another player.
    HostChanged {
        /// The new host.
        host: PlayerId,
    },

    /// The session moved from lobby to playing; tickets were issued.
    Started,

    /// A number was drawn.
    NumberDrawn {
        /// The drawn number.
        number: u8,
        /// 1-based position in the draw sequence.
        position: usize,
    },

    /// A pattern was resolved; at most one of these per pattern.
    ClaimResolved {
        /// The resolved pattern.
        pattern: ClaimPattern,
        /// The winner.
        winner: PlayerId,
    },

    /// The session reached its terminal state.
    Ended {
        /// Why it ended.
        reason: EndReason,
    },
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    /// Full house was claimed.
    FullHouse,
    /// The host ended the session.
    HostEnded,
    /// No active players remain.
    Deserted,
    /// An internal invariant was violated; diagnostic attached.
    Fault(String),
}

/// Events delivered to exactly one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DirectEvent {
    /// Full state projection, sent on join and reconnect.
    Snapshot(SessionSnapshot),
    /// The player's ticket, issued at start (or re-sent on rejoin).
    Ticket(Ticket),
}

/// One instruction for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send to every current member, in order.
    Broadcast(Envelope),
    /// Send to one player.
    ToPlayer {
        /// Recipient.
        player: PlayerId,
        /// Payload.
        event: DirectEvent,
    },
    /// Drop the player's subscription (kick).
    Detach {
        /// Player whose connection should detach.
        player: PlayerId,
    },
}

/// A roster line in events and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Player identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Membership status.
    pub status: PlayerStatus,
    /// Whether this player currently holds the host role.
    pub is_host: bool,
}

/// Read-only projection of the full session state.
///
/// This is the single source of truth a client rebuilds its mirror from;
/// incremental events with `seq >= last_seq` apply on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session: SessionId,
    /// Current host.
    pub host: PlayerId,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Roster in join order.
    pub roster: Vec<RosterEntry>,
    /// Drawn numbers in draw order.
    pub drawn: Vec<u8>,
    /// Resolved claims.
    pub claims: Vec<ClaimRecord>,
    /// Number of broadcast events incorporated; the next broadcast will
    /// carry this sequence number.
    pub last_seq: u64,
}

/// Build the roster projection for a session.
pub(crate) fn roster_of(session: &GameSession) -> Vec<RosterEntry> {
    session
        .players()
        .iter()
        .map(|p| RosterEntry {
            id: p.id,
            name: p.name.clone(),
            status: p.status,
            is_host: p.id == session.host(),
        })
        .collect()
}
