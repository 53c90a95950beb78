//! Sans-IO Tambola session logic.
//!
//! This crate holds the authoritative game state and the rules that mutate
//! it. It performs no I/O: every operation on a [`SessionCoordinator`]
//! returns a list of [`SessionAction`]s for a runtime to execute (broadcast
//! an event, unicast a ticket, detach a connection). The runtime decides how
//! those actions reach the network.
//!
//! # Components
//!
//! - [`ticket`]: ticket grid type and generator
//! - [`caller`]: the undrawn-number pool
//! - [`claim`]: win patterns and pure claim validation
//! - [`session`]: the session entity (roster, draws, resolved claims)
//! - [`coordinator`]: the `lobby → playing → ended` state machine
//! - [`event`]: outbound actions and the full-state snapshot
//! - [`error`]: recoverable error kinds
//!
//! # Concurrency contract
//!
//! A coordinator is not internally synchronized. The caller must serialize
//! all mutating operations on one session (the server crate does this with
//! one task per session). Under that discipline the check-and-record step of
//! [`SessionCoordinator::submit_claim`] is atomic, which is what guarantees
//! a pattern resolves at most once even when two players race for it.

pub mod caller;
pub mod claim;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod session;
pub mod ticket;

pub use caller::NumberCaller;
pub use claim::ClaimPattern;
pub use coordinator::SessionCoordinator;
pub use error::GameError;
pub use event::{
    DirectEvent, EndReason, Envelope, RosterEntry, SessionAction, SessionEvent, SessionSnapshot,
};
pub use session::{
    ClaimRecord, GameSession, Player, PlayerId, PlayerStatus, SessionId, SessionStatus,
};
pub use ticket::{Ticket, TicketError};
