//! Intent and event message types.

use serde::{Deserialize, Serialize};
use tambola_core::{
    ClaimPattern, DirectEvent, EndReason, Envelope, GameError, PlayerId, RosterEntry, SessionEvent,
    SessionId, SessionSnapshot, Ticket,
};

/// Client-to-server intents.
///
/// Clients never push state; every message here is a request the
/// authoritative server may refuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientIntent {
    /// Create a session; the creator becomes host.
    #[serde(rename = "session.create", rename_all = "camelCase")]
    Create {
        /// The host's player id.
        host_id: PlayerId,
        /// The host's display name.
        host_name: String,
    },

    /// Join (or rejoin) a session.
    #[serde(rename = "session.join", rename_all = "camelCase")]
    Join {
        /// Target session.
        session_id: SessionId,
        /// The joining player.
        player_id: PlayerId,
        /// Display name.
        player_name: String,
    },

    /// Leave a session.
    #[serde(rename = "session.leave", rename_all = "camelCase")]
    Leave {
        /// Target session.
        session_id: SessionId,
        /// The leaving player.
        player_id: PlayerId,
    },

    /// Kick a player (host only).
    #[serde(rename = "session.kick", rename_all = "camelCase")]
    Kick {
        /// Target session.
        session_id: SessionId,
        /// Requesting player; must be host.
        requester_id: PlayerId,
        /// Player to remove.
        target_id: PlayerId,
    },

    /// Start the game (host only).
    #[serde(rename = "session.start", rename_all = "camelCase")]
    Start {
        /// Target session.
        session_id: SessionId,
        /// Requesting player; must be host.
        requester_id: PlayerId,
    },

    /// Draw the next number (host only).
    #[serde(rename = "session.draw", rename_all = "camelCase")]
    Draw {
        /// Target session.
        session_id: SessionId,
        /// Requesting player; must be host.
        requester_id: PlayerId,
    },

    /// Claim a win pattern.
    #[serde(rename = "session.claim", rename_all = "camelCase")]
    Claim {
        /// Target session.
        session_id: SessionId,
        /// The claiming player.
        player_id: PlayerId,
        /// Pattern being claimed.
        pattern: ClaimPattern,
    },

    /// End the session (host only).
    #[serde(rename = "session.end", rename_all = "camelCase")]
    End {
        /// Target session.
        session_id: SessionId,
        /// Requesting player; must be host.
        requester_id: PlayerId,
    },
}

/// Server-to-client messages: unicast replies and sequenced broadcasts.
///
/// Broadcasts carry the per-session `seq`; a client that observes a gap
/// relative to its snapshot's `lastSeq` should rejoin for fresh state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply to `session.create`.
    #[serde(rename = "session.created", rename_all = "camelCase")]
    Created {
        /// The new session's id.
        session_id: SessionId,
    },

    /// Full state snapshot, unicast on join and reconnect.
    #[serde(rename = "session.state")]
    State {
        /// The projection to rebuild client state from.
        snapshot: SessionSnapshot,
    },

    /// A player's ticket, unicast at start or on rejoin.
    #[serde(rename = "session.ticket", rename_all = "camelCase")]
    Ticket {
        /// The session the ticket belongs to.
        session_id: SessionId,
        /// The ticket grid.
        ticket: Ticket,
    },

    /// Roster changed (join/leave/kick).
    #[serde(rename = "session.roster", rename_all = "camelCase")]
    Roster {
        /// Session this event belongs to.
        session_id: SessionId,
        /// Per-session sequence number.
        seq: u64,
        /// Roster after the change.
        roster: Vec<RosterEntry>,
        /// Set when the change was a join.
        #[serde(skip_serializing_if = "Option::is_none")]
        joined: Option<PlayerId>,
        /// Set when the change was a leave or kick.
        #[serde(skip_serializing_if = "Option::is_none")]
        left: Option<PlayerId>,
    },

    /// Host role moved.
    #[serde(rename = "session.host", rename_all = "camelCase")]
    Host {
        /// Session this event belongs to.
        session_id: SessionId,
        /// Per-session sequence number.
        seq: u64,
        /// The new host.
        host_id: PlayerId,
    },

    /// The game started.
    #[serde(rename = "session.started", rename_all = "camelCase")]
    Started {
        /// Session this event belongs to.
        session_id: SessionId,
        /// Per-session sequence number.
        seq: u64,
    },

    /// A number was drawn.
    #[serde(rename = "session.number", rename_all = "camelCase")]
    Number {
        /// Session this event belongs to.
        session_id: SessionId,
        /// Per-session sequence number.
        seq: u64,
        /// The drawn number.
        number: u8,
        /// 1-based position in the draw sequence.
        position: usize,
    },

    /// A claim was resolved.
    #[serde(rename = "session.claim", rename_all = "camelCase")]
    Claim {
        /// Session this event belongs to.
        session_id: SessionId,
        /// Per-session sequence number.
        seq: u64,
        /// The resolved pattern.
        pattern: ClaimPattern,
        /// The winner.
        winner_id: PlayerId,
        /// Always true on broadcast; invalid claims are unicast errors.
        valid: bool,
    },

    /// The session ended.
    #[serde(rename = "session.end", rename_all = "camelCase")]
    End {
        /// Session this event belongs to.
        session_id: SessionId,
        /// Per-session sequence number.
        seq: u64,
        /// Why it ended.
        reason: EndReason,
    },

    /// Error reply, unicast to the requesting connection only.
    #[serde(rename = "session.error", rename_all = "camelCase")]
    Error {
        /// Machine-readable error kind.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
    },
}

impl ServerMessage {
    /// Map a broadcast envelope to its wire message.
    pub fn from_envelope(session_id: SessionId, envelope: Envelope) -> Self {
        let Envelope { seq, event } = envelope;
        match event {
            SessionEvent::PlayerJoined { player, roster } => {
                ServerMessage::Roster { session_id, seq, roster, joined: Some(player), left: None }
            },
            SessionEvent::PlayerLeft { player, roster } => {
                ServerMessage::Roster { session_id, seq, roster, joined: None, left: Some(player) }
            },
            SessionEvent::HostChanged { host } => {
                ServerMessage::Host { session_id, seq, host_id: host }
            },
            SessionEvent::Started => ServerMessage::Started { session_id, seq },
            SessionEvent::NumberDrawn { number, position } => {
                ServerMessage::Number { session_id, seq, number, position }
            },
            SessionEvent::ClaimResolved { pattern, winner } => {
                ServerMessage::Claim { session_id, seq, pattern, winner_id: winner, valid: true }
            },
            SessionEvent::Ended { reason } => ServerMessage::End { session_id, seq, reason },
        }
    }

    /// Map a unicast event to its wire message.
    pub fn from_direct(session_id: SessionId, event: DirectEvent) -> Self {
        match event {
            DirectEvent::Snapshot(snapshot) => ServerMessage::State { snapshot },
            DirectEvent::Ticket(ticket) => ServerMessage::Ticket { session_id, ticket },
        }
    }

    /// Error reply for a failed intent.
    pub fn from_error(error: &GameError) -> Self {
        ServerMessage::Error { kind: ErrorKind::from(error), message: error.to_string() }
    }
}

/// Machine-readable error kinds on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// No such session.
    SessionNotFound,
    /// Session already reached its terminal state.
    AlreadyEnded,
    /// Operation not valid in the current status.
    IllegalState,
    /// Requester is not the host.
    NotHost,
    /// Kick target is the host or unknown.
    InvalidTarget,
    /// No numbers left to draw.
    Exhausted,
    /// Claim not satisfied.
    InvalidClaim,
    /// Pattern already resolved.
    DuplicateClaim,
    /// Malformed or unparseable message.
    BadRequest,
}

impl From<&GameError> for ErrorKind {
    fn from(error: &GameError) -> Self {
        match error {
            GameError::SessionNotFound(_) => ErrorKind::SessionNotFound,
            GameError::AlreadyEnded => ErrorKind::AlreadyEnded,
            GameError::IllegalState(_) => ErrorKind::IllegalState,
            GameError::NotHost(_) => ErrorKind::NotHost,
            GameError::InvalidTarget(_) => ErrorKind::InvalidTarget,
            GameError::Exhausted => ErrorKind::Exhausted,
            GameError::InvalidClaim(_) => ErrorKind::InvalidClaim,
            GameError::DuplicateClaim(_) => ErrorKind::DuplicateClaim,
        }
    }
}

#[cfg(test)]
mod tests {
    use tambola_core::SessionStatus;

    use super::*;

    #[test]
    fn intent_wire_shape() {
        let intent = ClientIntent::Claim {
            session_id: SessionId(7),
            player_id: PlayerId(42),
            pattern: ClaimPattern::EarlyFive,
        };
        let json = serde_json::to_value(&intent).expect("serialize failed");

        assert_eq!(json["type"], "session.claim");
        assert_eq!(json["sessionId"], 7);
        assert_eq!(json["playerId"], 42);
        assert_eq!(json["pattern"], "early-five");
    }

    #[test]
    fn intent_parses_from_wire() {
        let line = r#"{"type":"session.draw","sessionId":3,"requesterId":9}"#;
        let intent: ClientIntent = serde_json::from_str(line).expect("parse failed");
        assert_eq!(
            intent,
            ClientIntent::Draw { session_id: SessionId(3), requester_id: PlayerId(9) }
        );
    }

    #[test]
    fn number_broadcast_wire_shape() {
        let envelope =
            Envelope { seq: 12, event: SessionEvent::NumberDrawn { number: 42, position: 13 } };
        let msg = ServerMessage::from_envelope(SessionId(5), envelope);
        let json = serde_json::to_value(&msg).expect("serialize failed");

        assert_eq!(json["type"], "session.number");
        assert_eq!(json["seq"], 12);
        assert_eq!(json["number"], 42);
        assert_eq!(json["position"], 13);
    }

    #[test]
    fn roster_broadcast_omits_absent_fields() {
        let envelope = Envelope {
            seq: 0,
            event: SessionEvent::PlayerJoined {
                player: PlayerId(1),
                roster: vec![RosterEntry {
                    id: PlayerId(1),
                    name: "host".to_string(),
                    status: tambola_core::PlayerStatus::Active,
                    is_host: true,
                }],
            },
        };
        let json = serde_json::to_value(ServerMessage::from_envelope(SessionId(1), envelope))
            .expect("serialize failed");

        assert_eq!(json["type"], "session.roster");
        assert_eq!(json["joined"], 1);
        assert!(json.get("left").is_none());
        assert_eq!(json["roster"][0]["isHost"], true);
    }

    #[test]
    fn error_reply_carries_kind() {
        let msg = ServerMessage::from_error(&GameError::IllegalState(SessionStatus::Lobby));
        let json = serde_json::to_value(&msg).expect("serialize failed");
        assert_eq!(json["type"], "session.error");
        assert_eq!(json["kind"], "illegal-state");
    }
}
