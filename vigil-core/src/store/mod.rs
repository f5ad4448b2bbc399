//! Durable session rows.
//!
//! The store is the source of truth across process restarts. All calls are
//! synchronous and are made from background tasks, never from the
//! foreground loop.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::InMemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::session::Session;

/// Storage backend for session rows.
///
/// Implementations provide different storage backends:
/// - [`InMemoryStore`]: process-local, for tests and ephemeral runs
/// - [`SqliteStore`]: SQLite file (feature `sqlite`)
pub trait PersistenceStore: Send + Sync {
    /// Insert a new, valid session row.
    fn insert_session(
        &self,
        user_id: &str,
        session_id: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Move the expiry of a valid session.
    ///
    /// Fails when the row is unknown or already invalidated.
    fn update_session_expiry(&self, session_id: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Mark a session invalid. Unknown or already-invalid ids are not an error.
    fn invalidate_session(&self, session_id: &str) -> Result<()>;

    /// Read back one row.
    fn get_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// All rows for a user, newest first.
    fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>>;

    /// Best-effort teardown once the controller is done with the store.
    ///
    /// The store must stay usable afterwards so late invalidations still land.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
