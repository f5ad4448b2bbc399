//! Network latency probing and health classification.
//!
//! A probe answers "how long did a round trip to this host take?" or
//! `None` when the host could not be reached in time. [`classify`] turns
//! that answer into a [`Health`] the liveness monitor acts on.

mod ping;
mod tcp;

pub use ping::{parse_ping_time, PingProbe};
pub use tcp::TcpProbe;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};

/// Measures round-trip latency to a host.
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    /// Latency in milliseconds, or `None` for unreachable/timeout.
    async fn probe(&self, host: &str, timeout: Duration) -> Option<f64>;
}

/// Classified probe result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Health {
    /// Responded within the threshold
    Healthy(f64),
    /// Responded, but slower than the threshold
    Degraded(f64),
    /// Reported a zero (or nonsensical) round trip
    Malfunction,
    /// No response within the timeout
    Unreachable,
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy(_))
    }

    /// Healthy latency, or the network condition as an error.
    pub fn into_result(self, host: &str, threshold_ms: u64) -> Result<f64> {
        match self {
            Health::Healthy(ms) => Ok(ms),
            Health::Degraded(ms) => Err(Error::ProbeDegraded {
                host: host.to_string(),
                latency_ms: ms,
                threshold_ms,
            }),
            Health::Malfunction => Err(Error::ProbeMalfunction {
                host: host.to_string(),
            }),
            Health::Unreachable => Err(Error::ProbeUnreachable {
                host: host.to_string(),
            }),
        }
    }
}

/// Classify a probe result against a latency threshold.
///
/// A latency of exactly zero is treated as a probe malfunction rather than
/// an instant success. Latency equal to the threshold is still healthy.
pub fn classify(latency_ms: Option<f64>, threshold_ms: u64) -> Health {
    match latency_ms {
        None => Health::Unreachable,
        Some(ms) if !ms.is_finite() || ms <= 0.0 => Health::Malfunction,
        Some(ms) if ms > threshold_ms as f64 => Health::Degraded(ms),
        Some(ms) => Health::Healthy(ms),
    }
}

/// Run a probe, cutting it off at `timeout` even if the probe itself does not.
pub async fn measure(probe: &dyn LatencyProbe, host: &str, timeout: Duration) -> Option<f64> {
    tokio::time::timeout(timeout, probe.probe(host, timeout))
        .await
        .ok()
        .flatten()
}

/// Round milliseconds to two decimals.
pub(crate) fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}
