//! Error types for vigil-core.

use thiserror::Error;

use crate::session::LogoutReason;

/// Result type alias using vigil-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for session guarding
#[derive(Error, Debug)]
pub enum Error {
    // Session store failures (surfaced by SessionManager)
    #[error("Session creation failed: {0}")]
    CreationFailed(String),

    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Session invalidation failed: {0}")]
    InvalidationFailed(String),

    // Network conditions
    #[error("Network unreachable: no response from {host}")]
    ProbeUnreachable { host: String },

    #[error("Network degraded: {host} responded in {latency_ms}ms (threshold {threshold_ms}ms)")]
    ProbeDegraded {
        host: String,
        latency_ms: f64,
        threshold_ms: u64,
    },

    #[error("Latency probe malfunction: {host} reported a 0ms round trip")]
    ProbeMalfunction { host: String },

    // Time-based condition
    #[error("Session expired")]
    SessionExpired,

    // Raw store failures (returned by store implementations)
    #[error("Store error: {0}")]
    Store(String),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Session lock poisoned")]
    LockPoisoned,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a store error from any message
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// The forced-logout reason this condition maps to, if it ends the session.
    ///
    /// Store-layer failures never end a session by themselves.
    pub fn logout_reason(&self) -> Option<LogoutReason> {
        match self {
            Error::ProbeUnreachable { .. }
            | Error::ProbeDegraded { .. }
            | Error::ProbeMalfunction { .. } => Some(LogoutReason::NetworkDegraded),
            Error::SessionExpired => Some(LogoutReason::SessionExpired),
            _ => None,
        }
    }
}
