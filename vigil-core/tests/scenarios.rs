//! End-to-end session scenarios through the public API.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vigil_core::{
    Clock, Error, InMemoryStore, LatencyProbe, LivenessMonitor, LogoutOutcome, LogoutReason,
    ManualClock, NullPresenter, PersistenceStore, SessionConfig, SessionController, SessionEvent,
    SessionManager,
};

struct FixedProbe {
    latency_ms: Option<f64>,
    calls: AtomicUsize,
}

impl FixedProbe {
    fn new(latency_ms: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            latency_ms,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LatencyProbe for FixedProbe {
    async fn probe(&self, _host: &str, _timeout: Duration) -> Option<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.latency_ms
    }
}

fn start(
    config: &SessionConfig,
    probe: Arc<FixedProbe>,
    clock: &ManualClock,
    store: &InMemoryStore,
) -> SessionController {
    let manager = Arc::new(SessionManager::new(
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
        config,
    ));
    SessionController::start(
        "alice",
        config,
        manager,
        probe,
        Arc::new(clock.clone()),
        Arc::new(NullPresenter),
    )
}

#[tokio::test]
async fn refresh_at_ninety_seconds_moves_expiry_to_two_ten() {
    let config = SessionConfig {
        check_interval_secs: 3600,
        ..Default::default()
    };
    let clock = ManualClock::new(Utc::now());
    let t0 = clock.now();
    let store = InMemoryStore::new();
    let probe = FixedProbe::new(Some(25.0));
    let mut controller = start(&config, probe.clone(), &clock, &store);

    let session_id = match controller.next_event().await {
        SessionEvent::Established { session_id, .. } => session_id,
        other => panic!("expected Established, got {:?}", other),
    };

    clock.advance(ChronoDuration::seconds(90));
    assert!(controller.refresh());
    assert!(matches!(
        controller.next_event().await,
        SessionEvent::Refreshed { .. }
    ));

    let row = store.get_session(&session_id).unwrap().unwrap();
    assert_eq!(row.expires_at, t0 + ChronoDuration::seconds(210));
    assert_eq!(row.created_at, t0);

    let monitor = LivenessMonitor::new(
        &config,
        probe,
        Arc::new(clock.clone()),
        controller.session_state(),
    );

    clock.set(t0 + ChronoDuration::seconds(150));
    assert_eq!(monitor.check_once().await.unwrap(), 25.0);

    clock.set(t0 + ChronoDuration::seconds(211));
    assert!(matches!(
        monitor.check_once().await,
        Err(Error::SessionExpired)
    ));
}

#[tokio::test(start_paused = true)]
async fn unreachable_network_ends_session_once() {
    let config = SessionConfig::default();
    let clock = ManualClock::new(Utc::now());
    let store = InMemoryStore::new();
    let probe = FixedProbe::new(None);
    let mut controller = start(&config, probe.clone(), &clock, &store);

    let mut reasons = Vec::new();
    for _ in 0..3 {
        if let SessionEvent::LoggedOut { reason, .. } = controller.next_event().await {
            reasons.push(reason);
            break;
        }
    }
    assert_eq!(reasons, vec![LogoutReason::NetworkDegraded]);
    assert!(controller.monitor().is_cancelled());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(controller.monitor().firings(), 1);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

    assert_eq!(
        controller
            .force_logout(LogoutReason::NetworkDegraded, false)
            .await,
        LogoutOutcome::AlreadyLoggedOut
    );
}

#[tokio::test]
async fn user_logout_invalidates_stored_row() {
    let config = SessionConfig {
        check_interval_secs: 3600,
        ..Default::default()
    };
    let clock = ManualClock::new(Utc::now());
    let store = InMemoryStore::new();
    let mut controller = start(&config, FixedProbe::new(Some(25.0)), &clock, &store);

    let session_id = match controller.next_event().await {
        SessionEvent::Established { session_id, .. } => session_id,
        other => panic!("expected Established, got {:?}", other),
    };

    let outcome = controller
        .force_logout(LogoutReason::UserInitiated, true)
        .await;
    assert_eq!(outcome, LogoutOutcome::LoggedOut(LogoutReason::UserInitiated));

    controller.finish(Duration::from_secs(5)).await;

    let rows = store.list_sessions("alice").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, session_id);
    assert!(!rows[0].valid);

    // A refresh after logout never reaches the store
    assert!(!controller.refresh());
}
