//! SessionController - orchestration between background work and the foreground loop
//!
//! The controller never blocks on store or probe I/O. Every background task
//! posts its result on one channel, and [`SessionController::next_event`]
//! applies those results on the task that owns the controller:
//!
//! ```text
//! spawn_blocking(create_session) ──┐
//! spawn_blocking(refresh_session) ─┤
//! spawn_blocking(invalidate+close) ├──► mpsc ──► next_event() ──► SessionEvent
//! spawn(probe)                    ─┤
//! LivenessMonitor (LogoutRequest) ─┘
//! ```

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::monitor::{LivenessMonitor, LogoutRequest, MonitorHandle};
use crate::presenter::Presenter;
use crate::probe::{self, classify, LatencyProbe};
use crate::session::{LogoutReason, SessionManager, SessionState};

/// Results posted back to the foreground.
#[derive(Debug)]
enum ControlMessage {
    SessionCreated(Result<(String, DateTime<Utc>)>),
    SessionRefreshed(Result<DateTime<Utc>>),
    SessionInvalidated {
        session_id: Option<String>,
        result: Result<()>,
    },
    ConnectivityChecked(Result<f64>),
    LogoutRequested(LogoutRequest),
}

impl From<LogoutRequest> for ControlMessage {
    fn from(request: LogoutRequest) -> Self {
        ControlMessage::LogoutRequested(request)
    }
}

/// What applying one background result did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Established {
        session_id: String,
        expires_at: DateTime<Utc>,
    },
    CreationFailed {
        error: String,
    },
    Refreshed {
        expires_at: DateTime<Utc>,
    },
    RefreshFailed {
        error: String,
    },
    ConnectivityOk {
        latency_ms: f64,
    },
    LoggedOut {
        reason: LogoutReason,
        /// The failed check, for forced logouts
        detail: Option<String>,
    },
    /// Teardown finished and the row is invalid
    Invalidated {
        session_id: Option<String>,
    },
    /// Teardown finished but the store write failed
    InvalidationFailed {
        error: String,
    },
    /// A session created after logout was invalidated on arrival
    Abandoned {
        session_id: String,
    },
    /// Result arrived after logout and was dropped
    Ignored,
}

/// Result of a [`SessionController::force_logout`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    LoggedOut(LogoutReason),
    /// The user answered no to the confirmation prompt
    Declined,
    AlreadyLoggedOut,
}

/// Owns the session state for one running instance.
pub struct SessionController {
    user_id: String,
    manager: Arc<SessionManager>,
    probe: Arc<dyn LatencyProbe>,
    clock: Arc<dyn Clock>,
    presenter: Arc<dyn Presenter>,
    config: SessionConfig,
    state: Arc<RwLock<SessionState>>,
    monitor: MonitorHandle,
    tx: mpsc::UnboundedSender<ControlMessage>,
    rx: mpsc::UnboundedReceiver<ControlMessage>,
    logged_out: bool,
    creation_pending: bool,
    teardowns_pending: usize,
}

impl SessionController {
    /// Start session creation in the background and arm the liveness monitor.
    ///
    /// Returns immediately. Until creation lands the monitor enforces a
    /// provisional expiry of `now + timeout`. Must be called from within a
    /// tokio runtime.
    pub fn start(
        user_id: impl Into<String>,
        config: &SessionConfig,
        manager: Arc<SessionManager>,
        probe: Arc<dyn LatencyProbe>,
        clock: Arc<dyn Clock>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let user_id = user_id.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let provisional = clock.now() + manager.timeout();
        let state = Arc::new(RwLock::new(SessionState::provisional(provisional)));

        {
            let manager = Arc::clone(&manager);
            let tx = tx.clone();
            let user_id = user_id.clone();
            tokio::task::spawn_blocking(move || {
                let result = manager.create_session(&user_id);
                let _ = tx.send(ControlMessage::SessionCreated(result));
            });
        }

        let monitor = LivenessMonitor::new(
            config,
            Arc::clone(&probe),
            Arc::clone(&clock),
            Arc::clone(&state),
        )
        .spawn(tx.clone());

        info!(
            user_id = %user_id,
            provisional_expiry = %provisional,
            "Session controller started"
        );

        Self {
            user_id,
            manager,
            probe,
            clock,
            presenter,
            config: config.clone(),
            state,
            monitor,
            tx,
            rx,
            logged_out: false,
            creation_pending: true,
            teardowns_pending: 0,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Shared handle to the cached session state.
    pub fn session_state(&self) -> Arc<RwLock<SessionState>> {
        Arc::clone(&self.state)
    }

    pub fn snapshot(&self) -> SessionState {
        self.state
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn monitor(&self) -> &MonitorHandle {
        &self.monitor
    }

    pub fn is_logged_out(&self) -> bool {
        self.logged_out
    }

    /// Extend the session in the background.
    ///
    /// Returns false when nothing was dispatched: no session yet, already
    /// logged out, or already past expiry.
    pub fn refresh(&self) -> bool {
        if self.logged_out {
            debug!("Refresh ignored after logout");
            return false;
        }

        let state = self.snapshot();
        let Some(session_id) = state.session_id.clone() else {
            debug!("Refresh ignored: session not established yet");
            return false;
        };

        if state.is_expired_at(self.clock.now()) {
            warn!(session_id = %session_id, "Refusing to refresh an expired session");
            return false;
        }

        let manager = Arc::clone(&self.manager);
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = manager.refresh_session(&session_id);
            let _ = tx.send(ControlMessage::SessionRefreshed(result));
        });
        true
    }

    /// Probe the network now instead of waiting for the next tick.
    pub fn check_connectivity(&self) {
        let probe = Arc::clone(&self.probe);
        let tx = self.tx.clone();
        let host = self.config.probe_host.clone();
        let timeout = self.config.probe_timeout();
        let threshold_ms = self.config.latency_threshold_ms;

        tokio::spawn(async move {
            let latency = probe::measure(probe.as_ref(), &host, timeout).await;
            let result = classify(latency, threshold_ms).into_result(&host, threshold_ms);
            let _ = tx.send(ControlMessage::ConnectivityChecked(result));
        });
    }

    /// End the session and return the presentation to its entry point.
    ///
    /// With `require_confirmation` the presenter is asked first, and a "no"
    /// leaves everything (including the monitor) running. Store teardown runs
    /// in the background; I/O failures there never keep the user logged in.
    pub async fn force_logout(
        &mut self,
        reason: LogoutReason,
        require_confirmation: bool,
    ) -> LogoutOutcome {
        if self.logged_out {
            self.monitor.cancel();
            debug!(reason = %reason, "Already logged out");
            return LogoutOutcome::AlreadyLoggedOut;
        }

        if require_confirmation && !self.presenter.confirm_logout().await {
            info!(reason = %reason, "Logout declined");
            return LogoutOutcome::Declined;
        }

        self.monitor.cancel();
        self.logged_out = true;

        let session_id = self.snapshot().session_id;
        info!(reason = %reason, session_id = ?session_id, "Forced logout");

        // A pending creation tears down when it lands
        if !self.creation_pending {
            self.spawn_teardown(session_id);
        }

        self.presenter.on_forced_logout(reason);
        LogoutOutcome::LoggedOut(reason)
    }

    /// Wait for the next background result and apply it.
    pub async fn next_event(&mut self) -> SessionEvent {
        match self.rx.recv().await {
            Some(message) => self.apply(message).await,
            // `self.tx` keeps the channel open
            None => SessionEvent::Ignored,
        }
    }

    /// Drain creation and teardown results still in flight, up to `timeout`.
    pub async fn finish(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut events = Vec::new();

        while self.creation_pending || self.teardowns_pending > 0 {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(message)) => events.push(self.apply(message).await),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        creation_pending = self.creation_pending,
                        teardowns_pending = self.teardowns_pending,
                        "Timed out waiting for session teardown"
                    );
                    break;
                }
            }
        }

        events
    }

    async fn apply(&mut self, message: ControlMessage) -> SessionEvent {
        match message {
            ControlMessage::SessionCreated(result) => self.on_created(result),
            ControlMessage::SessionRefreshed(result) => self.on_refreshed(result),
            ControlMessage::SessionInvalidated { session_id, result } => {
                self.teardowns_pending = self.teardowns_pending.saturating_sub(1);
                match result {
                    Ok(()) => SessionEvent::Invalidated { session_id },
                    Err(e) => {
                        warn!(session_id = ?session_id, error = %e, "Session invalidation failed");
                        SessionEvent::InvalidationFailed {
                            error: e.to_string(),
                        }
                    }
                }
            }
            ControlMessage::ConnectivityChecked(result) => {
                if self.logged_out {
                    return SessionEvent::Ignored;
                }
                match result {
                    Ok(latency_ms) => {
                        debug!(latency_ms, "Connectivity check passed");
                        SessionEvent::ConnectivityOk { latency_ms }
                    }
                    Err(e) => {
                        warn!(error = %e, "Connectivity check failed");
                        let reason = e.logout_reason().unwrap_or(LogoutReason::NetworkDegraded);
                        self.logout_event(reason, e.to_string()).await
                    }
                }
            }
            ControlMessage::LogoutRequested(request) => {
                self.logout_event(request.reason, request.detail).await
            }
        }
    }

    async fn logout_event(&mut self, reason: LogoutReason, detail: String) -> SessionEvent {
        match self.force_logout(reason, false).await {
            LogoutOutcome::LoggedOut(reason) => SessionEvent::LoggedOut {
                reason,
                detail: Some(detail),
            },
            _ => SessionEvent::Ignored,
        }
    }

    fn on_created(&mut self, result: Result<(String, DateTime<Utc>)>) -> SessionEvent {
        self.creation_pending = false;

        match result {
            Ok((session_id, _)) if self.logged_out => {
                info!(session_id = %session_id, "Session created after logout, invalidating");
                self.spawn_teardown(Some(session_id.clone()));
                SessionEvent::Abandoned { session_id }
            }
            Ok((session_id, expires_at)) => {
                {
                    let mut state = self.write_state();
                    state.session_id = Some(session_id.clone());
                    state.expires_at = expires_at;
                }
                self.presenter.on_session_established(&session_id, expires_at);
                SessionEvent::Established {
                    session_id,
                    expires_at,
                }
            }
            Err(e) => {
                error!(user_id = %self.user_id, error = %e, "Session creation failed");
                if self.logged_out {
                    self.spawn_teardown(None);
                }
                SessionEvent::CreationFailed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn on_refreshed(&mut self, result: Result<DateTime<Utc>>) -> SessionEvent {
        if self.logged_out {
            return SessionEvent::Ignored;
        }

        match result {
            Ok(expires_at) => {
                let mut state = self.write_state();
                if expires_at > state.expires_at {
                    state.expires_at = expires_at;
                }
                SessionEvent::Refreshed {
                    expires_at: state.expires_at,
                }
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed, keeping previous expiry");
                SessionEvent::RefreshFailed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn spawn_teardown(&mut self, session_id: Option<String>) {
        self.teardowns_pending += 1;
        let manager = Arc::clone(&self.manager);
        let tx = self.tx.clone();

        tokio::task::spawn_blocking(move || {
            let result = match session_id.as_deref() {
                Some(id) => manager.invalidate_session(id),
                None => Ok(()),
            };
            if let Err(e) = manager.close_store() {
                warn!(error = %e, "Failed to close session store");
            }
            let _ = tx.send(ControlMessage::SessionInvalidated { session_id, result });
        });
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.monitor.cancel();
    }
}
