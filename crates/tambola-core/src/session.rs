//! Session State: one game's players, status, draws, and claim outcomes.
//!
//! The entity is owned exclusively by its coordinator; nothing here is
//! synchronized. Players are never physically removed while the session is
//! alive so claim records always point at a real roster entry; the whole
//! session is discarded after it ends.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::{claim::ClaimPattern, ticket::Ticket};

/// Session identifier, unique per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Player identifier, assigned by the external identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Formed, not yet started; roster still open.
    Lobby,
    /// Numbers being drawn, claims accepted.
    Playing,
    /// Terminal.
    Ended,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Lobby => "lobby",
            SessionStatus::Playing => "playing",
            SessionStatus::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// Membership status of a player within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// Present and connected.
    Active,
    /// Connection dropped; may reactivate by rejoining.
    Disconnected,
    /// Left or was kicked.
    Left,
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Identifier from the identity layer.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Membership status.
    pub status: PlayerStatus,
}

/// A resolved claim: who won a pattern, and what was drawn at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    /// The resolved pattern.
    pub pattern: ClaimPattern,
    /// Winning player.
    pub winner: PlayerId,
    /// Drawn sequence at the time of the win, for audit.
    pub drawn_at_win: Vec<u8>,
}

/// The authoritative state of one game session.
///
/// Roster order is join order; host transfer picks the next-joined active
/// player, which is why this is a `Vec` and not a map.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    host: PlayerId,
    status: SessionStatus,
    players: Vec<Player>,
    drawn: Vec<u8>,
    drawn_set: HashSet<u8>,
    tickets: HashMap<PlayerId, Ticket>,
    claims: BTreeMap<ClaimPattern, ClaimRecord>,
}

impl GameSession {
    /// New session in `Lobby` with the host as its first member.
    pub fn new(id: SessionId, host: PlayerId, host_name: impl Into<String>) -> Self {
        Self {
            id,
            host,
            status: SessionStatus::Lobby,
            players: vec![Player { id: host, name: host_name.into(), status: PlayerStatus::Active }],
            drawn: Vec::new(),
            drawn_set: HashSet::new(),
            tickets: HashMap::new(),
            claims: BTreeMap::new(),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current host.
    pub fn host(&self) -> PlayerId {
        self.host
    }

    /// Transfer the host role.
    pub fn set_host(&mut self, host: PlayerId) {
        self.host = host;
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Move to a new lifecycle status.
    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    /// Roster in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a member.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Look up a member mutably.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Append a new member.
    pub fn add_player(&mut self, id: PlayerId, name: impl Into<String>) {
        self.players.push(Player { id, name: name.into(), status: PlayerStatus::Active });
    }

    /// The next-joined active player other than `excluding`, if any.
    pub fn next_active_player(&self, excluding: PlayerId) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.status == PlayerStatus::Active && p.id != excluding)
            .map(|p| p.id)
    }

    /// Whether any member is still active.
    pub fn has_active_players(&self) -> bool {
        self.players.iter().any(|p| p.status == PlayerStatus::Active)
    }

    /// Drawn numbers in draw order.
    pub fn drawn(&self) -> &[u8] {
        &self.drawn
    }

    /// Drawn numbers as a membership set.
    pub fn drawn_set(&self) -> &HashSet<u8> {
        &self.drawn_set
    }

    /// Append a drawn number. Returns its 1-based position in the sequence.
    pub fn record_draw(&mut self, number: u8) -> usize {
        let fresh = self.drawn_set.insert(number);
        debug_assert!(fresh, "number {number} drawn twice");
        self.drawn.push(number);
        self.drawn.len()
    }

    /// A player's ticket, if one was issued.
    pub fn ticket(&self, player: PlayerId) -> Option<&Ticket> {
        self.tickets.get(&player)
    }

    /// Issue a ticket to a player.
    pub fn issue_ticket(&mut self, player: PlayerId, ticket: Ticket) {
        self.tickets.insert(player, ticket);
    }

    /// Resolved claims so far, in pattern order.
    pub fn claims(&self) -> impl Iterator<Item = &ClaimRecord> {
        self.claims.values()
    }

    /// Whether a pattern has already been resolved.
    pub fn claim_resolved(&self, pattern: ClaimPattern) -> bool {
        self.claims.contains_key(&pattern)
    }

    /// Record a pattern resolution. Caller must have checked
    /// [`Self::claim_resolved`] first, inside the same critical section.
    pub fn record_claim(&mut self, record: ClaimRecord) {
        debug_assert!(!self.claims.contains_key(&record.pattern));
        self.claims.insert(record.pattern, record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_first_member() {
        let session = GameSession::new(SessionId(1), PlayerId(10), "host");
        assert_eq!(session.host(), PlayerId(10));
        assert_eq!(session.players().len(), 1);
        assert_eq!(session.status(), SessionStatus::Lobby);
    }

    #[test]
    fn next_active_skips_left_players() {
        let mut session = GameSession::new(SessionId(1), PlayerId(10), "host");
        session.add_player(PlayerId(20), "second");
        session.add_player(PlayerId(30), "third");

        if let Some(p) = session.player_mut(PlayerId(20)) {
            p.status = PlayerStatus::Left;
        }

        assert_eq!(session.next_active_player(PlayerId(10)), Some(PlayerId(30)));
    }

    #[test]
    fn record_draw_tracks_membership() {
        let mut session = GameSession::new(SessionId(1), PlayerId(10), "host");
        assert_eq!(session.record_draw(17), 1);
        assert_eq!(session.record_draw(80), 2);
        assert!(session.drawn_set().contains(&17));
        assert_eq!(session.drawn(), &[17, 80]);
    }
}
