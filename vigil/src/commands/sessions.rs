//! Stored session inspection.

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use vigil_core::{PersistenceStore, Session, SqliteStore};

use crate::cli::{SessionsAction, SessionsCommand};
use crate::config::Config;
use crate::error::{VigilError, VigilResult};

pub fn execute(cmd: SessionsCommand, config: &Config) -> Result<()> {
    config.ensure_dirs()?;
    let store = SqliteStore::open(&config.paths.database_path)?;
    let now = Utc::now();

    match cmd.action {
        SessionsAction::List { user, json } => list(&store, &user, json, now),
        SessionsAction::Show { session_id, json } => show(&store, &session_id, json, now),
    }
}

fn list(store: &dyn PersistenceStore, user: &str, json: bool, now: DateTime<Utc>) -> Result<()> {
    let sessions = store.list_sessions(user)?;

    if json {
        println!("{}", to_json(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("{}", format!("No sessions for {}", user).yellow());
        return Ok(());
    }

    println!("{}", format!("Sessions for {}", user).cyan().bold());
    println!("{}", "─".repeat(72));
    for session in &sessions {
        println!(
            "  {}  {}  created {}  expires {}",
            status_badge(session, now),
            session.id,
            session.created_at.format("%Y-%m-%d %H:%M:%S"),
            session.expires_at.format("%H:%M:%S"),
        );
    }

    Ok(())
}

fn show(
    store: &dyn PersistenceStore,
    session_id: &str,
    json: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let session = store
        .get_session(session_id)?
        .ok_or_else(|| VigilError::SessionNotFound(session_id.to_string()))?;

    if json {
        println!("{}", to_json(&session)?);
        return Ok(());
    }

    println!("{}", "Session".cyan().bold());
    println!("  ID:       {}", session.id);
    println!("  User:     {}", session.user_id);
    println!("  Status:   {}", status_badge(&session, now));
    println!("  Created:  {}", session.created_at.to_rfc3339());
    println!("  Expires:  {}", session.expires_at.to_rfc3339());

    Ok(())
}

/// Row status as seen at `now`.
fn status_label(session: &Session, now: DateTime<Utc>) -> &'static str {
    if !session.valid {
        "invalidated"
    } else if session.is_expired_at(now) {
        "expired"
    } else {
        "active"
    }
}

fn status_badge(session: &Session, now: DateTime<Utc>) -> ColoredString {
    let label = status_label(session, now);
    match label {
        "active" => label.green(),
        "expired" => label.yellow(),
        _ => label.red(),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> VigilResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(valid: bool, expires_in: i64, now: DateTime<Utc>) -> Session {
        Session {
            id: "session-1".to_string(),
            user_id: "alice".to_string(),
            created_at: now - Duration::minutes(1),
            expires_at: now + Duration::seconds(expires_in),
            valid,
        }
    }

    #[test]
    fn test_status_label() {
        let now = Utc::now();

        assert_eq!(status_label(&session(true, 60, now), now), "active");
        assert_eq!(status_label(&session(true, 0, now), now), "active");
        assert_eq!(status_label(&session(true, -1, now), now), "expired");
        assert_eq!(status_label(&session(false, 60, now), now), "invalidated");
    }

    #[test]
    fn test_show_unknown_session_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = show(&store, "missing", false, Utc::now()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<VigilError>(),
            Some(VigilError::SessionNotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_session_json_fields() {
        let now = Utc::now();
        let json = to_json(&session(true, 60, now)).unwrap();

        assert!(json.contains("\"user_id\": \"alice\""));
        assert!(json.contains("\"valid\": true"));
    }
}
