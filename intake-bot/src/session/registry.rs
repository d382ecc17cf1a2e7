//! Active sessions by user.
//!
//! The map sits behind a `tokio::sync::RwLock` and each session behind its
//! own `tokio::sync::Mutex`. The map guard is always released before a
//! session is locked; nothing here hands out a guard.

use super::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// The user already has a session.
#[derive(Debug, Clone, thiserror::Error)]
#[error("user {user_id} already has an active report")]
pub struct AlreadyActive {
    pub user_id: String,
}

/// At most one session per user.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(user_id).cloned()
    }

    pub async fn contains(&self, user_id: &str) -> bool {
        self.sessions.read().await.contains_key(user_id)
    }

    /// Insert a session unless the user already has one.
    ///
    /// The check and the insert happen under one write guard.
    pub async fn create(&self, session: Session) -> Result<SessionHandle, AlreadyActive> {
        let user_id = session.user_id().to_string();
        let mut sessions = self.sessions.write().await;

        if sessions.contains_key(&user_id) {
            return Err(AlreadyActive { user_id });
        }

        let handle = Arc::new(Mutex::new(session));
        sessions.insert(user_id, handle.clone());
        Ok(handle)
    }

    /// Remove whatever session the user has.
    pub async fn remove(&self, user_id: &str) -> Option<SessionHandle> {
        self.sessions.write().await.remove(user_id)
    }

    /// Remove the user's session only if it is still `handle`.
    ///
    /// Returns false when the entry is gone or belongs to a newer session.
    pub async fn remove_if_same(&self, user_id: &str, handle: &SessionHandle) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(user_id) {
            Some(current) if Arc::ptr_eq(current, handle) => {
                sessions.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Clone every handle, for the sweeper.
    pub async fn snapshot(&self) -> Vec<(String, SessionHandle)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(user_id, handle)| (user_id.clone(), handle.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
