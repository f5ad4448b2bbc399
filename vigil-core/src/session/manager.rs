//! Serialized session creation, refresh, and invalidation.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::store::PersistenceStore;

use super::Session;

/// Owns the current session and mirrors every change into the store.
///
/// One mutex covers the cached session and the store call, so at most one
/// create/refresh/invalidate runs at a time and expiry timestamps are taken
/// in the same order they are written. The guard is released on every
/// return path, including store errors.
pub struct SessionManager {
    store: Arc<dyn PersistenceStore>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    /// Write-through copy of the current session
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        clock: Arc<dyn Clock>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            store,
            clock,
            timeout: config.timeout(),
            current: Mutex::new(None),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, Option<Session>>, String> {
        self.current
            .lock()
            .map_err(|_| "session lock poisoned".to_string())
    }

    /// Create a new session for `user_id` and make it current.
    ///
    /// Returns the new id and its expiry (`now + timeout`).
    pub fn create_session(&self, user_id: &str) -> Result<(String, DateTime<Utc>)> {
        let mut current = self.lock().map_err(Error::CreationFailed)?;

        let session_id = Uuid::new_v4().to_string();
        let created_at = self.clock.now();
        let expires_at = created_at + self.timeout;

        self.store
            .insert_session(user_id, &session_id, created_at, expires_at)
            .map_err(|e| Error::CreationFailed(e.to_string()))?;

        info!(
            session_id = %session_id,
            user_id = %user_id,
            expires_at = %expires_at,
            "Session created"
        );

        *current = Some(Session {
            id: session_id.clone(),
            user_id: user_id.to_string(),
            created_at,
            expires_at,
            valid: true,
        });

        Ok((session_id, expires_at))
    }

    /// Extend a session to `now + timeout` and return the new expiry.
    ///
    /// An invalidated session is never extended. The returned expiry is never
    /// earlier than one this manager already wrote for the same session.
    pub fn refresh_session(&self, session_id: &str) -> Result<DateTime<Utc>> {
        let mut current = self.lock().map_err(Error::RefreshFailed)?;
        let cached = current.as_mut().filter(|s| s.id == session_id);

        if cached.as_ref().is_some_and(|s| !s.valid) {
            return Err(Error::RefreshFailed(format!(
                "session has been invalidated: {}",
                session_id
            )));
        }

        let mut expires_at = self.clock.now() + self.timeout;
        if let Some(previous) = cached.as_ref().map(|s| s.expires_at) {
            // Wall clock stepped backwards
            expires_at = expires_at.max(previous);
        }

        self.store
            .update_session_expiry(session_id, expires_at)
            .map_err(|e| Error::RefreshFailed(e.to_string()))?;

        if let Some(session) = cached {
            session.expires_at = expires_at;
        }

        info!(session_id = %session_id, expires_at = %expires_at, "Session refreshed");
        Ok(expires_at)
    }

    /// Mark a session invalid in the store.
    ///
    /// Idempotent: a session this manager already invalidated is skipped
    /// without touching the store, and unknown ids are passed through to the
    /// store, which accepts them.
    pub fn invalidate_session(&self, session_id: &str) -> Result<()> {
        let mut current = self.lock().map_err(Error::InvalidationFailed)?;
        let cached = current.as_mut().filter(|s| s.id == session_id);

        if cached.as_ref().is_some_and(|s| !s.valid) {
            debug!(session_id = %session_id, "Session already invalidated");
            return Ok(());
        }

        self.store
            .invalidate_session(session_id)
            .map_err(|e| Error::InvalidationFailed(e.to_string()))?;

        if let Some(session) = cached {
            session.valid = false;
        }

        info!(session_id = %session_id, "Session invalidated");
        Ok(())
    }

    /// Release the store once the session is over.
    pub fn close_store(&self) -> Result<()> {
        let _current = self.lock().map_err(Error::Store)?;
        self.store.close()
    }

    /// Snapshot of the current session, if one was created.
    pub fn current(&self) -> Option<Session> {
        self.lock().ok().and_then(|guard| guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::InMemoryStore;
    use crate::testing::CountingStore;
    use std::thread;

    fn manager_with(store: Arc<dyn PersistenceStore>, clock: &ManualClock) -> SessionManager {
        SessionManager::new(store, Arc::new(clock.clone()), &SessionConfig::default())
    }

    #[test]
    fn test_create_session_persists_row() {
        let clock = ManualClock::new(Utc::now());
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_with(store.clone(), &clock);

        let (session_id, expires_at) = manager.create_session("user-1").unwrap();

        assert_eq!(expires_at, clock.now() + Duration::minutes(2));
        let row = store.get_session(&session_id).unwrap().unwrap();
        assert_eq!(row.user_id, "user-1");
        assert_eq!(row.created_at, clock.now());
        assert_eq!(row.expires_at, expires_at);
        assert!(row.valid);
        assert!(row.expires_at > row.created_at);

        let current = manager.current().unwrap();
        assert_eq!(current.id, session_id);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let clock = ManualClock::new(Utc::now());
        let manager = manager_with(Arc::new(InMemoryStore::new()), &clock);

        let (first, _) = manager.create_session("user-1").unwrap();
        let (second, _) = manager.create_session("user-1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_create_failure_reports_creation_failed() {
        let clock = ManualClock::new(Utc::now());
        let store = Arc::new(CountingStore::new());
        store.fail_writes(true);
        let manager = manager_with(store, &clock);

        let err = manager.create_session("user-1").unwrap_err();
        assert!(matches!(err, Error::CreationFailed(_)));

        // Lock was released on the error path
        assert!(manager.current().is_none());
        assert!(manager.invalidate_session("anything").is_err());
    }

    #[test]
    fn test_refresh_sequence_is_monotonic_and_tracks_last_refresh() {
        let t0 = Utc::now();
        let clock = ManualClock::new(t0);
        let store = Arc::new(InMemoryStore::new());
        let manager = manager_with(store.clone(), &clock);

        let (session_id, mut last) = manager.create_session("user-1").unwrap();

        for step in [5, 30, 1, 44, 90] {
            clock.advance(Duration::seconds(step));
            let refreshed_at = clock.now();
            let expires_at = manager.refresh_session(&session_id).unwrap();

            assert!(expires_at >= last);
            assert_eq!(expires_at, refreshed_at + Duration::minutes(2));
            last = expires_at;
        }

        assert_eq!(store.get_session(&session_id).unwrap().unwrap().expires_at, last);
    }

    #[test]
    fn test_refresh_never_regresses_when_clock_steps_back() {
        let clock = ManualClock::new(Utc::now());
        let manager = manager_with(Arc::new(InMemoryStore::new()), &clock);

        let (session_id, created_expiry) = manager.create_session("user-1").unwrap();
        clock.advance(Duration::seconds(-30));

        let expires_at = manager.refresh_session(&session_id).unwrap();
        assert_eq!(expires_at, created_expiry);
    }

    #[test]
    fn test_refresh_failure_keeps_previous_expiry() {
        let clock = ManualClock::new(Utc::now());
        let store = Arc::new(CountingStore::new());
        let manager = manager_with(store.clone(), &clock);

        let (session_id, expires_at) = manager.create_session("user-1").unwrap();
        store.fail_writes(true);
        clock.advance(Duration::seconds(60));

        let err = manager.refresh_session(&session_id).unwrap_err();
        assert!(matches!(err, Error::RefreshFailed(_)));
        assert_eq!(manager.current().unwrap().expires_at, expires_at);
    }

    #[test]
    fn test_refresh_after_invalidation_fails() {
        let clock = ManualClock::new(Utc::now());
        let manager = manager_with(Arc::new(InMemoryStore::new()), &clock);

        let (session_id, _) = manager.create_session("user-1").unwrap();
        manager.invalidate_session(&session_id).unwrap();

        let err = manager.refresh_session(&session_id).unwrap_err();
        assert!(matches!(err, Error::RefreshFailed(_)));
        assert!(!manager.current().unwrap().valid);
    }

    #[test]
    fn test_invalidate_twice_is_idempotent() {
        let clock = ManualClock::new(Utc::now());
        let store = Arc::new(CountingStore::new());
        let manager = manager_with(store.clone(), &clock);

        let (session_id, _) = manager.create_session("user-1").unwrap();

        manager.invalidate_session(&session_id).unwrap();
        manager.invalidate_session(&session_id).unwrap();

        assert_eq!(store.invalidations(), 1);
        assert!(!store.get_session(&session_id).unwrap().unwrap().valid);
    }

    #[test]
    fn test_invalidate_unknown_session_is_ok() {
        let clock = ManualClock::new(Utc::now());
        let manager = manager_with(Arc::new(InMemoryStore::new()), &clock);

        manager.invalidate_session("never-created").unwrap();
    }

    #[test]
    fn test_concurrent_refreshes_are_serialized() {
        let clock = ManualClock::new(Utc::now());
        let store = Arc::new(InMemoryStore::new());
        let manager = Arc::new(manager_with(store.clone(), &clock));
        let (session_id, _) = manager.create_session("user-1").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let clock = clock.clone();
                let session_id = session_id.clone();
                thread::spawn(move || {
                    clock.advance(Duration::seconds(1));
                    manager.refresh_session(&session_id).unwrap()
                })
            })
            .collect();

        let mut results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort();

        // The store holds the latest expiry handed out, never an older one
        let stored = store.get_session(&session_id).unwrap().unwrap().expires_at;
        assert_eq!(Some(&stored), results.last());
        assert_eq!(manager.current().unwrap().expires_at, stored);
    }
}
