//! Session Coordinator: the serialized authority for one session.
//!
//! The coordinator owns its [`GameSession`] and [`NumberCaller`] and applies
//! every player intent as a single `&mut self` call. The caller is
//! responsible for serializing those calls (the server crate runs one task
//! per session); under that discipline each operation is a critical section,
//! so claim validation and claim recording cannot interleave with another
//! claim for the same pattern.
//!
//! # State machine
//!
//! ```text
//! lobby ──start──▶ playing ──full-house claim / end / desertion──▶ ended
//!   │                                                               ▲
//!   └────────────────────── last active player leaves ──────────────┘
//! ```
//!
//! Truth lives here, never on clients: clients submit intents and render the
//! events and snapshots this module emits.

use rand::Rng;

use crate::{
    caller::NumberCaller,
    claim::ClaimPattern,
    error::GameError,
    event::{
        DirectEvent, EndReason, Envelope, SessionAction, SessionEvent, SessionSnapshot, roster_of,
    },
    session::{ClaimRecord, GameSession, PlayerId, PlayerStatus, SessionId, SessionStatus},
    ticket::Ticket,
};

/// The per-session state machine.
///
/// Generic over the RNG so tests drive it with a seeded generator while the
/// server uses entropy.
#[derive(Debug)]
pub struct SessionCoordinator<R: Rng> {
    session: GameSession,
    caller: NumberCaller,
    rng: R,
    next_seq: u64,
}

impl<R: Rng> SessionCoordinator<R> {
    /// Create a session in `Lobby` with the host auto-joined.
    pub fn new(id: SessionId, host: PlayerId, host_name: impl Into<String>, rng: R) -> Self {
        let session = GameSession::new(id, host, host_name);
        tracing::info!(session = %id, host = %host, "session created");
        Self { session, caller: NumberCaller::new(), rng, next_seq: 0 }
    }

    /// Read access to the session state.
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Full-state projection for join and reconnect.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.session.id(),
            host: self.session.host(),
            status: self.session.status(),
            roster: roster_of(&self.session),
            drawn: self.session.drawn().to_vec(),
            claims: self.session.claims().cloned().collect(),
            last_seq: self.next_seq,
        }
    }

    /// Add or reactivate a player.
    ///
    /// Allowed in `Lobby` and `Playing`. A player joining mid-game for the
    /// first time receives no ticket and can only observe; a returning
    /// player gets their existing ticket re-sent. The joiner also receives a
    /// full snapshot so its mirror starts from authoritative state.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::AlreadyEnded`] once the session has ended.
    pub fn join(
        &mut self,
        player: PlayerId,
        name: &str,
    ) -> Result<Vec<SessionAction>, GameError> {
        if self.session.status() == SessionStatus::Ended {
            return Err(GameError::AlreadyEnded);
        }

        match self.session.player_mut(player) {
            Some(existing) => {
                existing.status = PlayerStatus::Active;
            },
            None => {
                self.session.add_player(player, name);
            },
        }
        tracing::debug!(session = %self.session.id(), player = %player, "player joined");

        let roster = roster_of(&self.session);
        let mut actions = vec![self.broadcast(SessionEvent::PlayerJoined { player, roster })];
        actions.push(SessionAction::ToPlayer {
            player,
            event: DirectEvent::Snapshot(self.snapshot()),
        });
        if let Some(ticket) = self.session.ticket(player) {
            actions
                .push(SessionAction::ToPlayer { player, event: DirectEvent::Ticket(ticket.clone()) });
        }
        Ok(actions)
    }

    /// Mark a player as having left.
    ///
    /// If the host leaves, the role transfers to the next-joined active
    /// player; if nobody active remains, the session ends as deserted.
    /// Departing a member who already left or disconnected is a no-op, so a
    /// late connection teardown never replays the departure.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::AlreadyEnded`] after the session ended, or
    /// [`GameError::InvalidTarget`] for a non-member.
    pub fn leave(&mut self, player: PlayerId) -> Result<Vec<SessionAction>, GameError> {
        self.depart(player, PlayerStatus::Left)
    }

    /// Mark a player as disconnected after their connection dropped.
    ///
    /// Same roster consequences as [`Self::leave`], but the status records
    /// that the player may come back: a rejoin reactivates them and re-sends
    /// their ticket mid-game.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::AlreadyEnded`] after the session ended, or
    /// [`GameError::InvalidTarget`] for a non-member.
    pub fn disconnect(&mut self, player: PlayerId) -> Result<Vec<SessionAction>, GameError> {
        self.depart(player, PlayerStatus::Disconnected)
    }

    fn depart(
        &mut self,
        player: PlayerId,
        status: PlayerStatus,
    ) -> Result<Vec<SessionAction>, GameError> {
        if self.session.status() == SessionStatus::Ended {
            return Err(GameError::AlreadyEnded);
        }
        let member = self.session.player_mut(player).ok_or(GameError::InvalidTarget(player))?;
        if member.status != PlayerStatus::Active {
            // Kicked or already departed; a stale teardown changes nothing.
            return Ok(Vec::new());
        }
        member.status = status;
        tracing::debug!(session = %self.session.id(), player = %player, ?status, "player departed");

        let roster = roster_of(&self.session);
        let mut actions = vec![self.broadcast(SessionEvent::PlayerLeft { player, roster })];

        if !self.session.has_active_players() {
            self.end_session(EndReason::Deserted, &mut actions);
            return Ok(actions);
        }

        if player == self.session.host() {
            if let Some(next) = self.session.next_active_player(player) {
                self.session.set_host(next);
                tracing::info!(session = %self.session.id(), host = %next, "host transferred");
                actions.push(self.broadcast(SessionEvent::HostChanged { host: next }));
            }
        }

        Ok(actions)
    }

    /// Remove a player on the host's request.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotHost`] unless the requester is host,
    /// [`GameError::InvalidTarget`] if the target is the host or not a
    /// member, [`GameError::AlreadyEnded`] after the session ended.
    pub fn kick(
        &mut self,
        requester: PlayerId,
        target: PlayerId,
    ) -> Result<Vec<SessionAction>, GameError> {
        if self.session.status() == SessionStatus::Ended {
            return Err(GameError::AlreadyEnded);
        }
        self.require_host(requester)?;
        if target == self.session.host() {
            return Err(GameError::InvalidTarget(target));
        }
        let member = self.session.player_mut(target).ok_or(GameError::InvalidTarget(target))?;
        member.status = PlayerStatus::Left;
        tracing::info!(session = %self.session.id(), target = %target, "player kicked");

        let roster = roster_of(&self.session);
        Ok(vec![
            self.broadcast(SessionEvent::PlayerLeft { player: target, roster }),
            SessionAction::Detach { player: target },
        ])
    }

    /// Start the game: issue one ticket per active player, move to
    /// `Playing`.
    ///
    /// A ticket failing its generation invariants is a programming defect;
    /// the session is forced to `Ended` with a diagnostic instead of
    /// continuing on corrupted state.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotHost`] unless the requester is host,
    /// [`GameError::IllegalState`] unless the session is in `Lobby`.
    pub fn start(&mut self, requester: PlayerId) -> Result<Vec<SessionAction>, GameError> {
        self.require_host(requester)?;
        if self.session.status() != SessionStatus::Lobby {
            return Err(GameError::IllegalState(self.session.status()));
        }

        let recipients: Vec<PlayerId> = self
            .session
            .players()
            .iter()
            .filter(|p| p.status == PlayerStatus::Active)
            .map(|p| p.id)
            .collect();

        let mut tickets = Vec::with_capacity(recipients.len());
        for player in &recipients {
            match Ticket::generate(&mut self.rng) {
                Ok(ticket) => tickets.push((*player, ticket)),
                Err(e) => {
                    tracing::error!(session = %self.session.id(), error = %e, "ticket generation fault");
                    let mut actions = Vec::new();
                    self.end_session(EndReason::Fault(e.to_string()), &mut actions);
                    return Ok(actions);
                },
            }
        }

        for (player, ticket) in &tickets {
            self.session.issue_ticket(*player, ticket.clone());
        }
        self.session.set_status(SessionStatus::Playing);
        tracing::info!(session = %self.session.id(), players = recipients.len(), "game started");

        let mut actions = vec![self.broadcast(SessionEvent::Started)];
        for (player, ticket) in tickets {
            actions.push(SessionAction::ToPlayer { player, event: DirectEvent::Ticket(ticket) });
        }
        Ok(actions)
    }

    /// Draw the next number.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotHost`] unless the requester is host,
    /// [`GameError::IllegalState`] unless `Playing`, or
    /// [`GameError::Exhausted`] after all 90 numbers. Exhaustion does not
    /// end the session; the host may still end it.
    pub fn draw_next(&mut self, requester: PlayerId) -> Result<Vec<SessionAction>, GameError> {
        self.require_host(requester)?;
        if self.session.status() != SessionStatus::Playing {
            return Err(GameError::IllegalState(self.session.status()));
        }

        let number = self.caller.draw(&mut self.rng)?;
        let position = self.session.record_draw(number);
        tracing::debug!(session = %self.session.id(), number, position, "number drawn");

        Ok(vec![self.broadcast(SessionEvent::NumberDrawn { number, position })])
    }

    /// Adjudicate a claim.
    ///
    /// Check and record happen inside this single call, so under the
    /// session's serialization discipline a pattern resolves exactly once:
    /// of two racing valid claims, whichever is applied first wins and the
    /// other fails `DuplicateClaim`.
    ///
    /// A full-house resolution ends the session.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::IllegalState`] unless `Playing`,
    /// [`GameError::DuplicateClaim`] if the pattern is already resolved, or
    /// [`GameError::InvalidClaim`] if the claimant is not an active member,
    /// has no ticket (observers), or the ticket does not satisfy the
    /// pattern.
    pub fn submit_claim(
        &mut self,
        player: PlayerId,
        pattern: ClaimPattern,
    ) -> Result<Vec<SessionAction>, GameError> {
        if self.session.status() != SessionStatus::Playing {
            return Err(GameError::IllegalState(self.session.status()));
        }
        if self.session.claim_resolved(pattern) {
            return Err(GameError::DuplicateClaim(pattern));
        }
        // Kicked and departed players keep their audit entries but lose the
        // right to claim.
        let active =
            self.session.player(player).is_some_and(|p| p.status == PlayerStatus::Active);
        if !active {
            return Err(GameError::InvalidClaim(pattern));
        }
        let ticket = self.session.ticket(player).ok_or(GameError::InvalidClaim(pattern))?;
        if !pattern.is_satisfied(ticket, self.session.drawn_set()) {
            return Err(GameError::InvalidClaim(pattern));
        }

        self.session.record_claim(ClaimRecord {
            pattern,
            winner: player,
            drawn_at_win: self.session.drawn().to_vec(),
        });
        tracing::info!(session = %self.session.id(), winner = %player, %pattern, "claim resolved");

        let mut actions = vec![self.broadcast(SessionEvent::ClaimResolved { pattern, winner: player })];
        if pattern == ClaimPattern::FullHouse {
            self.end_session(EndReason::FullHouse, &mut actions);
        }
        Ok(actions)
    }

    /// End the session on the host's request.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotHost`] unless the requester is host,
    /// [`GameError::IllegalState`] unless `Playing`.
    pub fn end(&mut self, requester: PlayerId) -> Result<Vec<SessionAction>, GameError> {
        self.require_host(requester)?;
        if self.session.status() != SessionStatus::Playing {
            return Err(GameError::IllegalState(self.session.status()));
        }
        let mut actions = Vec::new();
        self.end_session(EndReason::HostEnded, &mut actions);
        Ok(actions)
    }

    fn require_host(&self, requester: PlayerId) -> Result<(), GameError> {
        if requester != self.session.host() {
            return Err(GameError::NotHost(requester));
        }
        Ok(())
    }

    fn end_session(&mut self, reason: EndReason, actions: &mut Vec<SessionAction>) {
        self.session.set_status(SessionStatus::Ended);
        tracing::info!(session = %self.session.id(), ?reason, "session ended");
        actions.push(self.broadcast(SessionEvent::Ended { reason }));
    }

    /// Wrap an event in an envelope carrying the next sequence number.
    fn broadcast(&mut self, event: SessionEvent) -> SessionAction {
        let seq = self.next_seq;
        self.next_seq += 1;
        SessionAction::Broadcast(Envelope { seq, event })
    }
}
