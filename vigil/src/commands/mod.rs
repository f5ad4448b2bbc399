//! Command implementations for vigil CLI.
//!
//! Each submodule implements the logic for a command group.

pub mod config;
pub mod probe;
pub mod run;
pub mod sessions;

use std::sync::Arc;
use vigil_core::{
    InMemoryStore, LatencyProbe, PersistenceStore, PingProbe, ProbeMethod, SessionConfig,
    SqliteStore, TcpProbe,
};

use crate::config::Config;
use crate::error::{VigilError, VigilResult};

/// Build the latency probe selected by `probe_method`.
pub fn build_probe(session: &SessionConfig) -> VigilResult<Arc<dyn LatencyProbe>> {
    match session.probe_method {
        ProbeMethod::Tcp => Ok(Arc::new(TcpProbe::new(session.probe_port))),
        ProbeMethod::Ping => {
            if !PingProbe::available() {
                return Err(VigilError::ProbeUnavailable(
                    "ping not found in PATH (use probe_method = \"tcp\")".to_string(),
                ));
            }
            Ok(Arc::new(PingProbe))
        }
    }
}

/// Open the session store: SQLite at the configured path, or memory only.
pub fn open_store(config: &Config, ephemeral: bool) -> VigilResult<Arc<dyn PersistenceStore>> {
    if ephemeral {
        return Ok(Arc::new(InMemoryStore::new()));
    }

    config.ensure_dirs()?;
    Ok(Arc::new(SqliteStore::open(&config.paths.database_path)?))
}
