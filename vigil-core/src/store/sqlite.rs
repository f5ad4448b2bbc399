//! SQLite session storage.
//!
//! Rows live in the `user_session` table; timestamps are stored as unix
//! milliseconds, so values read back are truncated to millisecond precision.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::Session;

use super::PersistenceStore;

/// Session table schema (001)
pub const USER_SESSION_SQL: &str = include_str!("migrations/001_user_session.sql");

/// SQLite-backed store.
///
/// Thread-safe via internal Mutex. All operations acquire the lock.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened session database");
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(USER_SESSION_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    fn map_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        Ok(Session {
            id: row.get(0)?,
            user_id: row.get(1)?,
            created_at: millis_to_datetime(row.get(2)?, 2)?,
            expires_at: millis_to_datetime(row.get(3)?, 3)?,
            valid: row.get(4)?,
        })
    }
}

fn millis_to_datetime(ms: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, ms))
}

impl PersistenceStore for SqliteStore {
    fn insert_session(
        &self,
        user_id: &str,
        session_id: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_session (session_id, user_id, created_at, expires_at, valid)
             VALUES (?1, ?2, ?3, ?4, 1)",
            params![
                session_id,
                user_id,
                created_at.timestamp_millis(),
                expires_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn update_session_expiry(&self, session_id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE user_session SET expires_at = ?1 WHERE session_id = ?2 AND valid = 1",
            params![expires_at.timestamp_millis(), session_id],
        )?;

        if updated == 0 {
            return Err(Error::store(format!(
                "session not found or invalidated: {}",
                session_id
            )));
        }
        Ok(())
    }

    fn invalidate_session(&self, session_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE user_session SET valid = 0 WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(())
    }

    fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, user_id, created_at, expires_at, valid
             FROM user_session WHERE session_id = ?1",
        )?;

        Ok(stmt
            .query_row(params![session_id], Self::map_session)
            .optional()?)
    }

    fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, user_id, created_at, expires_at, valid
             FROM user_session WHERE user_id = ?1
             ORDER BY created_at DESC",
        )?;
        let sessions = stmt
            .query_map(params![user_id], Self::map_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn close(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("PRAGMA optimize")?;
        Ok(())
    }
}
