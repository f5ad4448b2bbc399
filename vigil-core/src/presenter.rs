//! Presentation boundary notified by the controller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::session::LogoutReason;

/// Receives session notifications and answers logout prompts.
///
/// Notifications are called from the foreground loop and must not block.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// A real session replaced the provisional one.
    fn on_session_established(&self, session_id: &str, expires_at: DateTime<Utc>);

    /// Tear down the authenticated view and return to the entry point.
    fn on_forced_logout(&self, reason: LogoutReason);

    /// Ask the user whether to log out. `false` cancels the logout.
    async fn confirm_logout(&self) -> bool;
}

/// Presenter that ignores notifications and always confirms.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

#[async_trait]
impl Presenter for NullPresenter {
    fn on_session_established(&self, _session_id: &str, _expires_at: DateTime<Utc>) {}

    fn on_forced_logout(&self, _reason: LogoutReason) {}

    async fn confirm_logout(&self) -> bool {
        true
    }
}
