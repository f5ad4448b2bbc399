//! One-off latency probe.

use anyhow::Result;
use colored::Colorize;
use vigil_core::probe::measure;
use vigil_core::{classify, Health, ProbeMethod};

use super::build_probe;
use crate::config::Config;

pub async fn execute(
    host: Option<String>,
    method: Option<ProbeMethod>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let mut session = config.session.clone();
    if let Some(host) = host {
        session.probe_host = host;
    }
    if let Some(method) = method {
        session.probe_method = method;
    }

    let probe = build_probe(&session)?;
    let latency = measure(probe.as_ref(), &session.probe_host, session.probe_timeout()).await;
    let health = classify(latency, session.latency_threshold_ms);

    if json {
        let output = serde_json::json!({
            "host": session.probe_host,
            "method": session.probe_method.to_string(),
            "latency_ms": latency,
            "threshold_ms": session.latency_threshold_ms,
            "health": health_label(&health),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {} via {}",
        "Probing".cyan().bold(),
        session.probe_host,
        session.probe_method
    );

    match health {
        Health::Healthy(ms) => println!("  {} {:.2}ms", "✓ healthy".green(), ms),
        Health::Degraded(ms) => println!(
            "  {} {:.2}ms (threshold {}ms)",
            "⚠ degraded".yellow(),
            ms,
            session.latency_threshold_ms
        ),
        Health::Malfunction => println!("  {} reported a 0ms round trip", "✗ malfunction".red()),
        Health::Unreachable => println!(
            "  {} no response within {}s",
            "✗ unreachable".red(),
            session.probe_timeout_secs
        ),
    }

    if !health.is_healthy() {
        println!(
            "  {}",
            "A running session would be logged out on this result.".dimmed()
        );
    }

    Ok(())
}

fn health_label(health: &Health) -> &'static str {
    match health {
        Health::Healthy(_) => "healthy",
        Health::Degraded(_) => "degraded",
        Health::Malfunction => "malfunction",
        Health::Unreachable => "unreachable",
    }
}
