//! Wire messages for the Tambola real-time channel.
//!
//! One JSON object per message, tagged by a dotted `type` field
//! (`session.create`, `session.number`, ...). Clients send
//! [`ClientIntent`]s; the server answers with unicast replies and sequenced
//! broadcasts, both [`ServerMessage`]s.
//!
//! This crate defines shapes only; no game logic lives here.

mod message;

pub use message::{ClientIntent, ErrorKind, ServerMessage};
