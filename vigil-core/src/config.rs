//! Session guard configuration.
//!
//! Every field has a default so a partial `[session]` table is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Longest session timeout accepted (one day)
pub const MAX_TIMEOUT_MINUTES: u64 = 24 * 60;

/// How the liveness monitor measures latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// Time a TCP connect to `probe_host:probe_port`
    #[default]
    Tcp,
    /// Run the system `ping` binary once
    Ping,
}

impl std::fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeMethod::Tcp => write!(f, "tcp"),
            ProbeMethod::Ping => write!(f, "ping"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime from creation or last refresh, in minutes
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,

    /// Liveness check interval in seconds
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Latency above this is considered degraded
    #[serde(default = "default_latency_threshold")]
    pub latency_threshold_ms: u64,

    /// Well-known host used for the reachability probe
    #[serde(default = "default_probe_host")]
    pub probe_host: String,

    /// Upper bound on a single probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default)]
    pub probe_method: ProbeMethod,

    /// Port used by the TCP probe
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,
}

fn default_timeout_minutes() -> u64 {
    2
}

fn default_check_interval() -> u64 {
    30
}

fn default_latency_threshold() -> u64 {
    200
}

fn default_probe_host() -> String {
    "google.com".to_string()
}

fn default_probe_timeout() -> u64 {
    2
}

fn default_probe_port() -> u16 {
    443
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
            check_interval_secs: default_check_interval(),
            latency_threshold_ms: default_latency_threshold(),
            probe_host: default_probe_host(),
            probe_timeout_secs: default_probe_timeout(),
            probe_method: ProbeMethod::default(),
            probe_port: default_probe_port(),
        }
    }
}

impl SessionConfig {
    /// Session lifetime as a chrono duration (for expiry arithmetic).
    pub fn timeout(&self) -> chrono::Duration {
        let minutes = self.timeout_minutes.min(MAX_TIMEOUT_MINUTES) as i64;
        chrono::Duration::seconds(minutes * 60)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Reject values the monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_minutes == 0 {
            return Err(Error::Config("timeout_minutes must be greater than 0".into()));
        }
        if self.timeout_minutes > MAX_TIMEOUT_MINUTES {
            return Err(Error::Config(format!(
                "timeout_minutes must be at most {}",
                MAX_TIMEOUT_MINUTES
            )));
        }
        if self.check_interval_secs == 0 {
            return Err(Error::Config(
                "check_interval_secs must be greater than 0".into(),
            ));
        }
        if self.latency_threshold_ms == 0 {
            return Err(Error::Config(
                "latency_threshold_ms must be greater than 0".into(),
            ));
        }
        if self.probe_timeout_secs == 0 {
            return Err(Error::Config(
                "probe_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.probe_host.trim().is_empty() {
            return Err(Error::Config("probe_host must not be empty".into()));
        }
        Ok(())
    }
}
