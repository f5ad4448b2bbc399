//! In-memory session storage.
//!
//! Suitable for development, testing, and ephemeral runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::session::Session;

use super::PersistenceStore;

/// In-memory session storage.
///
/// Stores rows in a `HashMap` protected by a `RwLock`, keyed by session ID.
/// Rows are lost when the process exits.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows currently stored.
    pub fn len(&self) -> usize {
        self.sessions.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistenceStore for InMemoryStore {
    fn insert_session(
        &self,
        user_id: &str,
        session_id: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(|_| Error::LockPoisoned)?;

        if sessions.contains_key(session_id) {
            return Err(Error::store(format!("duplicate session id: {}", session_id)));
        }

        sessions.insert(
            session_id.to_string(),
            Session {
                id: session_id.to_string(),
                user_id: user_id.to_string(),
                created_at,
                expires_at,
                valid: true,
            },
        );
        Ok(())
    }

    fn update_session_expiry(&self, session_id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(|_| Error::LockPoisoned)?;

        match sessions.get_mut(session_id) {
            Some(session) if session.valid => {
                session.expires_at = expires_at;
                Ok(())
            }
            _ => Err(Error::store(format!(
                "session not found or invalidated: {}",
                session_id
            ))),
        }
    }

    fn invalidate_session(&self, session_id: &str) -> Result<()> {
        if let Some(session) = self
            .sessions
            .write()
            .map_err(|_| Error::LockPoisoned)?
            .get_mut(session_id)
        {
            session.valid = false;
        }
        Ok(())
    }

    fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().map_err(|_| Error::LockPoisoned)?;
        Ok(sessions.get(session_id).cloned())
    }

    fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().map_err(|_| Error::LockPoisoned)?;
        let mut rows: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}
