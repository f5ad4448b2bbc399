//! LivenessMonitor - recurring network health and expiry check
//!
//! One task per session sleeps for the check interval, probes the network,
//! then compares the clock against the cached expiry. A failed check posts a
//! single [`LogoutRequest`] to the foreground loop and ends the task.
//!
//! ```text
//! Scheduled ──tick──► Firing ──ok──► Scheduled
//!     │                  │
//!   cancel        fail / cancel
//!     │                  │
//!     └────► Cancelled ◄─┘   (terminal)
//! ```

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::probe::{self, classify, LatencyProbe};
use crate::session::{LogoutReason, SessionState};

/// Monitor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Scheduled,
    Firing,
    Cancelled,
}

impl MonitorState {
    fn as_u8(self) -> u8 {
        match self {
            MonitorState::Scheduled => 0,
            MonitorState::Firing => 1,
            MonitorState::Cancelled => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => MonitorState::Scheduled,
            1 => MonitorState::Firing,
            _ => MonitorState::Cancelled,
        }
    }
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorState::Scheduled => write!(f, "scheduled"),
            MonitorState::Firing => write!(f, "firing"),
            MonitorState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Forced logout asked for by a failed check.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoutRequest {
    pub reason: LogoutReason,
    /// The failed condition, for logs and the user-visible notice
    pub detail: String,
}

/// State shared between the monitor task and its handles.
#[derive(Debug)]
struct StateCell {
    state: AtomicU8,
    firings: AtomicU64,
}

impl StateCell {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(MonitorState::Scheduled.as_u8()),
            firings: AtomicU64::new(0),
        }
    }

    fn load(&self) -> MonitorState {
        MonitorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Move `from -> to`; false if another transition got there first.
    fn transition(&self, from: MonitorState, to: MonitorState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn cancel(&self) -> MonitorState {
        MonitorState::from_u8(
            self.state
                .swap(MonitorState::Cancelled.as_u8(), Ordering::SeqCst),
        )
    }
}

/// Recurring liveness check for one session.
pub struct LivenessMonitor {
    probe: Arc<dyn LatencyProbe>,
    clock: Arc<dyn Clock>,
    session: Arc<RwLock<SessionState>>,
    host: String,
    interval: Duration,
    probe_timeout: Duration,
    threshold_ms: u64,
}

impl LivenessMonitor {
    pub fn new(
        config: &SessionConfig,
        probe: Arc<dyn LatencyProbe>,
        clock: Arc<dyn Clock>,
        session: Arc<RwLock<SessionState>>,
    ) -> Self {
        Self {
            probe,
            clock,
            session,
            host: config.probe_host.clone(),
            interval: config.check_interval(),
            probe_timeout: config.probe_timeout(),
            threshold_ms: config.latency_threshold_ms,
        }
    }

    /// Run one check: network health first, then expiry.
    ///
    /// Returns the healthy latency, or the condition that ends the session.
    pub async fn check_once(&self) -> Result<f64> {
        let latency = probe::measure(self.probe.as_ref(), &self.host, self.probe_timeout).await;
        let latency_ms =
            classify(latency, self.threshold_ms).into_result(&self.host, self.threshold_ms)?;

        // Read id and expiry together
        let state = self
            .session
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|e| e.into_inner().clone());
        let now = self.clock.now();
        if state.is_expired_at(now) {
            debug!(
                session_id = ?state.session_id,
                expires_at = %state.expires_at,
                now = %now,
                "Session past expiry"
            );
            return Err(Error::SessionExpired);
        }

        Ok(latency_ms)
    }

    /// Start the recurring check. The first firing is one interval from now.
    ///
    /// Failed checks are delivered on `tx`, converted into the receiver's
    /// message type.
    pub fn spawn<T>(self, tx: mpsc::UnboundedSender<T>) -> MonitorHandle
    where
        T: From<LogoutRequest> + Send + 'static,
    {
        let cell = Arc::new(StateCell::new());
        let task_cell = Arc::clone(&cell);

        info!(
            host = %self.host,
            interval_secs = self.interval.as_secs(),
            threshold_ms = self.threshold_ms,
            "Liveness monitor started"
        );

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(self.interval).await;

                if !task_cell.transition(MonitorState::Scheduled, MonitorState::Firing) {
                    break;
                }
                let firing = task_cell.firings.fetch_add(1, Ordering::SeqCst) + 1;

                match self.check_once().await {
                    Ok(latency_ms) => {
                        debug!(firing, latency_ms, "Liveness check passed");
                        if !task_cell.transition(MonitorState::Firing, MonitorState::Scheduled) {
                            break;
                        }
                    }
                    Err(e) => {
                        // A concurrent cancel already owns the logout
                        if task_cell.transition(MonitorState::Firing, MonitorState::Cancelled) {
                            let reason = e.logout_reason().unwrap_or(LogoutReason::NetworkDegraded);
                            warn!(firing, reason = %reason, error = %e, "Liveness check failed");
                            let request = LogoutRequest {
                                reason,
                                detail: e.to_string(),
                            };
                            if tx.send(T::from(request)).is_err() {
                                debug!("Logout request dropped: receiver closed");
                            }
                        }
                        break;
                    }
                }
            }
            debug!("Liveness monitor stopped");
        });

        MonitorHandle {
            cell,
            abort_handle: task.abort_handle(),
        }
    }
}

/// Cancellation handle for a running monitor.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    cell: Arc<StateCell>,
    abort_handle: tokio::task::AbortHandle,
}

impl MonitorHandle {
    /// Stop the monitor. Safe to call any number of times.
    pub fn cancel(&self) {
        let previous = self.cell.cancel();
        self.abort_handle.abort();
        if previous != MonitorState::Cancelled {
            info!(previous = %previous, "Liveness monitor cancelled");
        }
    }

    pub fn state(&self) -> MonitorState {
        self.cell.load()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == MonitorState::Cancelled
    }

    /// Number of checks started so far.
    pub fn firings(&self) -> u64 {
        self.cell.firings.load(Ordering::SeqCst)
    }
}
