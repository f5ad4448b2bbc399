//! vigil-core - Core library for vigil
//!
//! Guards a single authenticated session for one running instance:
//!
//! - **session**: Session entity, cached state, and the serialized `SessionManager`
//! - **store**: `PersistenceStore` seam with SQLite and in-memory backends
//! - **probe**: `LatencyProbe` seam with TCP-connect and system `ping` probes
//! - **monitor**: Recurring liveness check (network health + expiry)
//! - **controller**: Orchestration between background tasks and the foreground loop

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod monitor;
pub mod presenter;
pub mod probe;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ProbeMethod, SessionConfig};
pub use controller::{LogoutOutcome, SessionController, SessionEvent};
pub use error::{Error, Result};
pub use monitor::{LivenessMonitor, LogoutRequest, MonitorHandle, MonitorState};
pub use presenter::{NullPresenter, Presenter};
pub use probe::{classify, Health, LatencyProbe, PingProbe, TcpProbe};
pub use session::{LogoutReason, Session, SessionManager, SessionState};
pub use store::{InMemoryStore, PersistenceStore};
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
