//! Fakes shared by unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::presenter::Presenter;
use crate::probe::LatencyProbe;
use crate::session::{LogoutReason, Session};
use crate::store::{InMemoryStore, PersistenceStore};

/// In-memory store that counts calls and can be told to fail writes.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    fail_writes: AtomicBool,
    invalidations: AtomicUsize,
    closes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Invalidations that reached the underlying store.
    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::store("store unavailable"));
        }
        Ok(())
    }
}

impl PersistenceStore for CountingStore {
    fn insert_session(
        &self,
        user_id: &str,
        session_id: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_writable()?;
        self.inner
            .insert_session(user_id, session_id, created_at, expires_at)
    }

    fn update_session_expiry(&self, session_id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.check_writable()?;
        self.inner.update_session_expiry(session_id, expires_at)
    }

    fn invalidate_session(&self, session_id: &str) -> Result<()> {
        self.check_writable()?;
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.inner.invalidate_session(session_id)
    }

    fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.inner.get_session(session_id)
    }

    fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        self.inner.list_sessions(user_id)
    }

    fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Probe that replays scripted latencies, then repeats a fallback.
pub struct ScriptedProbe {
    script: Mutex<VecDeque<Option<f64>>>,
    fallback: Option<f64>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(script: impl IntoIterator<Item = Option<f64>>, fallback: Option<f64>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with the same latency.
    pub fn constant(latency_ms: Option<f64>) -> Self {
        Self::new([], latency_ms)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LatencyProbe for ScriptedProbe {
    async fn probe(&self, _host: &str, _timeout: Duration) -> Option<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(self.fallback)
    }
}

/// Probe that never answers.
pub struct HangingProbe;

#[async_trait]
impl LatencyProbe for HangingProbe {
    async fn probe(&self, _host: &str, _timeout: Duration) -> Option<f64> {
        std::future::pending::<()>().await;
        Some(10.0)
    }
}

/// Presenter that records notifications and answers prompts with a fixed reply.
pub struct RecordingPresenter {
    confirm: AtomicBool,
    pub established: Mutex<Vec<(String, DateTime<Utc>)>>,
    pub logouts: Mutex<Vec<LogoutReason>>,
    prompts: AtomicUsize,
}

impl RecordingPresenter {
    pub fn new(confirm: bool) -> Self {
        Self {
            confirm: AtomicBool::new(confirm),
            established: Mutex::new(Vec::new()),
            logouts: Mutex::new(Vec::new()),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn set_confirm(&self, confirm: bool) {
        self.confirm.store(confirm, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> Vec<LogoutReason> {
        self.logouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    fn on_session_established(&self, session_id: &str, expires_at: DateTime<Utc>) {
        self.established
            .lock()
            .unwrap()
            .push((session_id.to_string(), expires_at));
    }

    fn on_forced_logout(&self, reason: LogoutReason) {
        self.logouts.lock().unwrap().push(reason);
    }

    async fn confirm_logout(&self) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.confirm.load(Ordering::SeqCst)
    }
}
