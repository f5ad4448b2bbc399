//! System `ping` probe.
//!
//! Runs `ping -c 1 -W <wait> <host>` and reads the `time=` field of the reply.

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{round_ms, LatencyProbe};

/// ICMP echo through the system `ping` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingProbe;

impl PingProbe {
    /// Check if a `ping` binary is installed and available.
    pub fn available() -> bool {
        match which::which("ping") {
            Ok(path) => {
                debug!("Found ping at: {:?}", path);
                true
            }
            Err(_) => false,
        }
    }
}

#[async_trait]
impl LatencyProbe for PingProbe {
    async fn probe(&self, host: &str, timeout: Duration) -> Option<f64> {
        // Never let a host be parsed as a ping flag
        if host.is_empty() || host.starts_with('-') {
            return None;
        }

        let wait = wait_arg(timeout);
        let output = Command::new("ping")
            .args(["-c", "1", "-W", &wait, host])
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                debug!(host = %host, error = %e, "Failed to run ping");
                return None;
            }
        };

        if !output.status.success() {
            debug!(host = %host, status = ?output.status, "ping reported no reply");
            return None;
        }

        parse_ping_time(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Value for `-W`: milliseconds on the BSD ping, whole seconds on Linux.
fn wait_arg(timeout: Duration) -> String {
    if cfg!(any(target_os = "macos", target_os = "freebsd")) {
        timeout.as_millis().max(1).to_string()
    } else {
        timeout.as_secs().max(1).to_string()
    }
}

/// Extract the round-trip time in milliseconds from `ping` output.
pub fn parse_ping_time(output: &str) -> Option<f64> {
    let start = output.find("time=")? + "time=".len();
    let rest = &output[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());

    rest[..end].parse::<f64>().ok().map(round_ms)
}
