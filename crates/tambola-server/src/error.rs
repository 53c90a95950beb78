//! Server runtime error types.
//!
//! These cover transport and channel plumbing only. Game-rule failures are
//! [`tambola_core::GameError`]s and travel back to the requesting client as
//! unicast error messages; they never surface here.

/// Errors from the server runtime.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid configuration (bad bind address, ...).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Socket-level failure.
    #[error("transport error: {0}")]
    Transport(String),
}
