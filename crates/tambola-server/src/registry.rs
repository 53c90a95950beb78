//! Process-wide table of live sessions.
//!
//! The registry owns the routing entry for every active session: a handle
//! wrapping the session task's command channel. `create` spawns the task,
//! `get` routes intents to it, `remove` is called by the task itself once
//! the session ends and its terminal events are flushed. After removal,
//! lookups fail with `SessionNotFound`.

use std::{collections::HashMap, sync::Arc};

use rand::{RngCore, SeedableRng, rngs::StdRng};
use tambola_core::{GameError, PlayerId, SessionCoordinator, SessionId};
use tokio::sync::{RwLock, mpsc};

use crate::session_task::{self, SessionCommand};

/// Routing handle for one session's command channel.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// The session this handle routes to.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queue a command for the session task.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SessionNotFound`] if the task has stopped (the
    /// session ended between lookup and send).
    pub fn send(&self, command: SessionCommand) -> Result<(), GameError> {
        self.commands.send(command).map_err(|_| GameError::SessionNotFound(self.id))
    }
}

/// Table of active sessions, keyed by session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    /// New empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a session hosted by `host` and spawn its task.
    ///
    /// The host is auto-joined to the roster but has no connection attached
    /// yet; the gateway follows up with a `Join` command carrying one.
    pub async fn create(
        self: &Arc<Self>,
        host: PlayerId,
        host_name: &str,
    ) -> SessionId {
        let mut rng = StdRng::from_entropy();
        let mut sessions = self.sessions.write().await;

        let id = loop {
            let candidate = SessionId(rng.next_u64());
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        let coordinator = SessionCoordinator::new(id, host, host_name, rng);
        let (tx, rx) = mpsc::unbounded_channel();
        sessions.insert(id, SessionHandle { id, commands: tx });
        drop(sessions);

        tokio::spawn(session_task::run(id, coordinator, rx, Arc::clone(self)));
        tracing::info!(session = %id, host = %host, "session registered");
        id
    }

    /// Look up the routing handle for a session.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SessionNotFound`] for unknown or removed ids.
    pub async fn get(&self, id: SessionId) -> Result<SessionHandle, GameError> {
        self.sessions.read().await.get(&id).cloned().ok_or(GameError::SessionNotFound(id))
    }

    /// Drop a session's routing entry.
    pub async fn remove(&self, id: SessionId) {
        if self.sessions.write().await.remove(&id).is_some() {
            tracing::info!(session = %id, "session unregistered");
        }
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_lookup() {
        let registry = SessionRegistry::new();
        let id = registry.create(PlayerId(1), "host").await;

        assert_eq!(registry.count().await, 1);
        let handle = registry.get(id).await.expect("lookup failed");
        assert_eq!(handle.id(), id);
    }

    #[tokio::test]
    async fn lookup_unknown_session_fails() {
        let registry = SessionRegistry::new();
        let missing = SessionId(0xdead);
        assert!(matches!(
            registry.get(missing).await,
            Err(GameError::SessionNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn remove_clears_routing() {
        let registry = SessionRegistry::new();
        let id = registry.create(PlayerId(1), "host").await;

        registry.remove(id).await;
        assert_eq!(registry.count().await, 0);
        assert!(matches!(registry.get(id).await, Err(GameError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn sessions_get_distinct_ids() {
        let registry = SessionRegistry::new();
        let a = registry.create(PlayerId(1), "a").await;
        let b = registry.create(PlayerId(2), "b").await;
        assert_ne!(a, b);
        assert_eq!(registry.count().await, 2);
    }
}
