use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::session::Session;
use crate::error::{RelayError, RelayResult};

/// Active sessions keyed by connection id
///
/// A session is visible under at most one key, and `remove` hands it out
/// exactly once.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session; fails `AlreadyActive` if the connection has one
    pub async fn insert(&self, connection_id: &str, session: Arc<Session>) -> RelayResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(connection_id) {
            return Err(RelayError::AlreadyActive(connection_id.to_string()));
        }
        sessions.insert(connection_id.to_string(), session);
        Ok(())
    }

    pub async fn get(&self, connection_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(connection_id).cloned()
    }

    /// Detach the session; later callers get `None`
    pub async fn remove(&self, connection_id: &str) -> Option<Arc<Session>> {
        self.sessions.write().await.remove(connection_id)
    }

    /// Detach the session only if it is still the one writing `section_id`
    pub async fn remove_section(&self, connection_id: &str, section_id: Uuid) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(connection_id) {
            Some(session) if session.section_id() == section_id => sessions.remove(connection_id),
            _ => None,
        }
    }

    pub async fn contains(&self, connection_id: &str) -> bool {
        self.sessions.read().await.contains_key(connection_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn connection_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }
}
