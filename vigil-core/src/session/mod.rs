//! Session entity and cached session state.
//!
//! ## Lifecycle
//!
//! ```text
//! Startup
//!   │
//!   ├─► Provisional expiry (now + timeout) until creation returns
//!   │
//!   └─► create_session ──► (session_id, expires_at) cached
//!
//! During Session
//!   │
//!   └─► refresh_session ──► expires_at = now + timeout
//!
//! Logout (user, expiry, or network)
//!   │
//!   └─► invalidate_session ──► valid = false (terminal)
//! ```

mod manager;

pub use manager::SessionManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One authenticated session row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque random identifier, never reused
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Cleared by invalidation; never set again
    pub valid: bool,
}

impl Session {
    /// True once `now` is past the expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Why the authenticated view was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogoutReason {
    NetworkDegraded,
    SessionExpired,
    UserInitiated,
}

impl LogoutReason {
    /// User-visible message for this reason.
    pub fn message(&self) -> &'static str {
        match self {
            LogoutReason::NetworkDegraded => {
                "Network connection is slow or unavailable. Please try again later."
            }
            LogoutReason::SessionExpired => "Your session has expired. You will be logged out.",
            LogoutReason::UserInitiated => "You have been logged out.",
        }
    }
}

impl std::fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogoutReason::NetworkDegraded => write!(f, "network_degraded"),
            LogoutReason::SessionExpired => write!(f, "session_expired"),
            LogoutReason::UserInitiated => write!(f, "user_initiated"),
        }
    }
}

/// The controller's view of the current session.
///
/// Shared with the liveness monitor behind one lock so the id/expiry pair
/// is always read together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// None until the background creation completes
    pub session_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl SessionState {
    /// State used before a real session exists.
    pub fn provisional(expires_at: DateTime<Utc>) -> Self {
        Self {
            session_id: None,
            expires_at,
        }
    }

    pub fn is_established(&self) -> bool {
        self.session_id.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session_created_at(t0: DateTime<Utc>) -> Session {
        Session {
            id: "session-1".to_string(),
            user_id: "user-1".to_string(),
            created_at: t0,
            expires_at: t0 + Duration::minutes(2),
            valid: true,
        }
    }

    #[test]
    fn test_expiry_boundary_two_minute_timeout() {
        let t0 = Utc::now();
        let session = session_created_at(t0);

        assert!(!session.is_expired_at(t0 + Duration::seconds(119)));
        assert!(!session.is_expired_at(t0 + Duration::seconds(120)));
        assert!(session.is_expired_at(t0 + Duration::seconds(121)));
    }

    #[test]
    fn test_provisional_state() {
        let expires = Utc::now() + Duration::minutes(2);
        let state = SessionState::provisional(expires);

        assert!(!state.is_established());
        assert_eq!(state.expires_at, expires);
        assert!(!state.is_expired_at(expires));
        assert!(state.is_expired_at(expires + Duration::seconds(1)));
    }

    #[test]
    fn test_logout_reason_messages_are_distinct() {
        let network = LogoutReason::NetworkDegraded.message();
        let expired = LogoutReason::SessionExpired.message();
        let user = LogoutReason::UserInitiated.message();

        assert_ne!(network, expired);
        assert_ne!(expired, user);
        assert!(network.contains("Network"));
        assert!(expired.contains("expired"));
    }
}
