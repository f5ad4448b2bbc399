//! TCP-connect latency probe.

use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::debug;

use super::{round_ms, LatencyProbe};

/// Times how long a TCP handshake with `host:port` takes.
///
/// Needs no privileges, unlike ICMP echo. Name resolution shares the
/// overall timeout but is not part of the reported latency.
#[derive(Debug, Clone, Copy)]
pub struct TcpProbe {
    port: u16,
}

impl TcpProbe {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    async fn probe_with<R, F>(&self, host: &str, timeout: Duration, resolve: R) -> Option<f64>
    where
        R: FnOnce(String, u16) -> F,
        F: Future<Output = io::Result<Vec<SocketAddr>>>,
    {
        let deadline = Instant::now() + timeout;

        let resolving = resolve(host.to_string(), self.port);
        let addrs = match tokio::time::timeout_at(deadline, resolving).await {
            Ok(Ok(addrs)) => addrs,
            Ok(Err(e)) => {
                debug!(host = %host, error = %e, "TCP probe could not resolve host");
                return None;
            }
            Err(_) => {
                debug!(host = %host, "TCP probe timed out resolving host");
                return None;
            }
        };

        // Only the attempt that connects is timed
        for addr in addrs {
            let started = Instant::now();
            match tokio::time::timeout_at(deadline, TcpStream::connect(addr)).await {
                Ok(Ok(_stream)) => {
                    let latency = round_ms(started.elapsed().as_secs_f64() * 1000.0);
                    debug!(host = %host, %addr, latency_ms = latency, "TCP probe answered");
                    return Some(latency);
                }
                Ok(Err(e)) => {
                    debug!(host = %host, addr = %addr, error = %e, "TCP probe attempt failed");
                }
                Err(_) => {
                    debug!(host = %host, addr = %addr, "TCP probe timed out");
                    return None;
                }
            }
        }

        debug!(host = %host, port = self.port, "TCP probe found no reachable address");
        None
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(443)
    }
}

async fn lookup(host: String, port: u16) -> io::Result<Vec<SocketAddr>> {
    Ok(tokio::net::lookup_host((host.as_str(), port)).await?.collect())
}

#[async_trait]
impl LatencyProbe for TcpProbe {
    async fn probe(&self, host: &str, timeout: Duration) -> Option<f64> {
        self.probe_with(host, timeout, lookup).await
    }
}
