//! Recoverable error kinds for session operations.
//!
//! Every variant is an expected user-facing condition, reported to the
//! requesting connection only and never fatal to the session. Generator
//! invariant violations (`TicketError`) stay inside the coordinator, which
//! forces the session to `Ended` with a diagnostic instead of surfacing
//! them here.

use crate::{
    claim::ClaimPattern,
    session::{PlayerId, SessionId, SessionStatus},
};

/// Errors returned by session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// No session with this identifier is registered.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The session has reached its terminal state.
    #[error("session has already ended")]
    AlreadyEnded,

    /// The operation is not valid in the session's current status.
    #[error("operation not valid while session is {0}")]
    IllegalState(SessionStatus),

    /// A host-only operation was requested by a non-host.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// The kick target is the host or not a member.
    #[error("invalid target: {0}")]
    InvalidTarget(PlayerId),

    /// All 90 numbers have been drawn.
    #[error("no numbers left to draw")]
    Exhausted,

    /// The claimed pattern is not satisfied by the claimant's ticket.
    #[error("claim for {0} is not satisfied")]
    InvalidClaim(ClaimPattern),

    /// The pattern has already been resolved this session.
    #[error("{0} has already been claimed")]
    DuplicateClaim(ClaimPattern),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            GameError::NotHost(PlayerId(7)).to_string(),
            format!("player {} is not the host", PlayerId(7))
        );
        assert_eq!(
            GameError::DuplicateClaim(ClaimPattern::TopLine).to_string(),
            "top-line has already been claimed"
        );
        assert_eq!(GameError::Exhausted.to_string(), "no numbers left to draw");
    }
}
