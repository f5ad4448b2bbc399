//! Interactive guarded session.
//!
//! The foreground loop reads commands from stdin while the controller's
//! background results arrive through `next_event()`. A forced logout ends
//! the loop, which stands in for returning to the login screen.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::{Mutex, Notify};
use tracing::warn;
use vigil_core::{
    Clock, LogoutOutcome, LogoutReason, Presenter, SessionController, SessionEvent,
    SessionManager, SystemClock,
};

use super::{build_probe, open_store};
use crate::config::Config;

/// How long to wait for store teardown before exiting
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Input shared by the command loop and the logout prompt.
type InputLines<R> = Arc<Mutex<Lines<R>>>;

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Refresh,
    Open(String),
    Status,
    Logout,
    Help,
    Empty,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return Command::Empty;
        };

        match word.to_ascii_lowercase().as_str() {
            "refresh" | "r" => Command::Refresh,
            "open" | "o" => {
                let view: Vec<&str> = parts.collect();
                if view.is_empty() {
                    Command::Unknown("open needs a view name".to_string())
                } else {
                    Command::Open(view.join(" "))
                }
            }
            "status" | "s" => Command::Status,
            "logout" | "quit" | "exit" | "q" => Command::Logout,
            "help" | "h" | "?" => Command::Help,
            other => Command::Unknown(format!("unknown command: {}", other)),
        }
    }
}

/// Terminal side of the presentation boundary.
struct TerminalPresenter<R> {
    input: InputLines<R>,
    interrupts: Arc<Notify>,
}

#[async_trait]
impl<R> Presenter for TerminalPresenter<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn on_session_established(&self, session_id: &str, expires_at: DateTime<Utc>) {
        println!(
            "{} Session {} established (expires {})",
            "✓".green(),
            short_id(session_id).cyan(),
            local_time(expires_at)
        );
    }

    fn on_forced_logout(&self, reason: LogoutReason) {
        let message = reason.message();
        match reason {
            LogoutReason::NetworkDegraded => println!("{} {}", "✗".red(), message.red().bold()),
            LogoutReason::SessionExpired => println!("{} {}", "⏱".yellow(), message.yellow()),
            LogoutReason::UserInitiated => println!("{} {}", "✓".green(), message),
        }
        println!("{}", "Returning to login.".dimmed());
    }

    async fn confirm_logout(&self) -> bool {
        print!("Are you sure you want to log out? [y/N] ");
        let _ = std::io::stdout().flush();

        let mut input = self.input.lock().await;
        tokio::select! {
            line = input.next_line() => match line {
                Ok(Some(line)) => line.trim().eq_ignore_ascii_case("y"),
                _ => false,
            },
            // Ctrl-C at the prompt answers "no"
            _ = self.interrupts.notified() => {
                println!();
                false
            }
        }
    }
}

/// Forward every SIGINT for the life of the process.
///
/// The listener is registered before this returns, and a press with no
/// waiter is kept as a pending permit.
fn listen_for_interrupts() -> std::io::Result<Arc<Notify>> {
    let notify = Arc::new(Notify::new());
    let forward = Arc::clone(&notify);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut stream = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                forward.notify_one();
            }
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            forward.notify_one();
        }
    });

    Ok(notify)
}

pub async fn execute(user: &str, ephemeral: bool, config: &Config) -> Result<()> {
    let store = open_store(config, ephemeral)?;
    let probe = build_probe(&config.session)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let manager = Arc::new(SessionManager::new(store, Arc::clone(&clock), &config.session));

    let input = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let interrupts = listen_for_interrupts()?;
    let presenter = Arc::new(TerminalPresenter {
        input: Arc::clone(&input),
        interrupts: Arc::clone(&interrupts),
    });

    println!("{}", format!("vigil session for {}", user).cyan().bold());
    println!("{}", "─".repeat(50));
    println!(
        "  Timeout: {}m · checks every {}s · {} via {} (threshold {}ms)",
        config.session.timeout_minutes,
        config.session.check_interval_secs,
        config.session.probe_host,
        config.session.probe_method,
        config.session.latency_threshold_ms
    );
    if ephemeral {
        println!("  {}", "Ephemeral: session rows are kept in memory".dimmed());
    }
    println!();

    let mut controller =
        SessionController::start(user, &config.session, manager, probe, clock, presenter);
    print_help();

    // View waiting on an on-demand connectivity check
    let mut pending_view: Option<String> = None;

    while !controller.is_logged_out() {
        tokio::select! {
            event = controller.next_event() => {
                report(&event, &mut pending_view);
            }
            line = read_line(&input) => {
                match line {
                    Ok(Some(line)) => {
                        let command = Command::parse(&line);
                        handle_command(command, &mut controller, &mut pending_view).await;
                    }
                    Ok(None) => {
                        // EOF: nobody is left to answer a prompt
                        controller.force_logout(LogoutReason::UserInitiated, false).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read input");
                        controller.force_logout(LogoutReason::UserInitiated, false).await;
                    }
                }
            }
            _ = interrupts.notified() => {
                println!();
                controller.force_logout(LogoutReason::UserInitiated, false).await;
            }
        }
    }

    for event in controller.finish(TEARDOWN_TIMEOUT).await {
        report(&event, &mut pending_view);
    }

    Ok(())
}

async fn read_line<R>(input: &InputLines<R>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    input.lock().await.next_line().await
}

async fn handle_command(
    command: Command,
    controller: &mut SessionController,
    pending_view: &mut Option<String>,
) {
    match command {
        Command::Refresh => {
            if controller.refresh() {
                println!("{}", "Refreshing session...".dimmed());
            } else if controller.snapshot().is_established() {
                println!("{}", "Session can no longer be refreshed.".yellow());
            } else {
                println!("{}", "Session is still being created.".yellow());
            }
        }
        Command::Open(view) => {
            // Navigation counts as activity and re-checks the network
            controller.refresh();
            controller.check_connectivity();
            *pending_view = Some(view);
        }
        Command::Status => print_status(controller),
        Command::Logout => {
            match controller.force_logout(LogoutReason::UserInitiated, true).await {
                LogoutOutcome::Declined => println!("{}", "Still logged in.".dimmed()),
                LogoutOutcome::LoggedOut(_) | LogoutOutcome::AlreadyLoggedOut => {}
            }
        }
        Command::Help => print_help(),
        Command::Empty => {}
        Command::Unknown(message) => {
            println!("{} {}", "?".yellow(), message);
            println!("  Type {} for commands.", "help".cyan());
        }
    }
}

fn report(event: &SessionEvent, pending_view: &mut Option<String>) {
    for line in render(event, pending_view) {
        println!("{}", line);
    }
}

/// Terminal lines for one session event.
fn render(event: &SessionEvent, pending_view: &mut Option<String>) -> Vec<String> {
    match event {
        // An abandoned session is followed by its own Invalidated event
        SessionEvent::Established { .. }
        | SessionEvent::Abandoned { .. }
        | SessionEvent::Ignored => Vec::new(),
        SessionEvent::CreationFailed { error } => vec![
            format!("{} Could not create a session: {}", "✗".red(), error),
            format!("  {}", "Continuing without a stored session.".dimmed()),
        ],
        SessionEvent::Refreshed { expires_at } => vec![format!(
            "{} Session extended to {}",
            "✓".green(),
            local_time(*expires_at)
        )],
        SessionEvent::RefreshFailed { .. } => vec![
            "Could not extend the session; expiry unchanged."
                .yellow()
                .to_string(),
        ],
        SessionEvent::ConnectivityOk { latency_ms } => match pending_view.take() {
            Some(view) => vec![format!(
                "{} Opened {} ({:.0}ms)",
                "→".cyan(),
                view.bold(),
                latency_ms
            )],
            None => Vec::new(),
        },
        SessionEvent::LoggedOut { detail, .. } => {
            pending_view.take();
            detail
                .iter()
                .map(|detail| format!("  {}", detail.dimmed()))
                .collect()
        }
        SessionEvent::Invalidated { .. } => vec!["Session closed.".dimmed().to_string()],
        SessionEvent::InvalidationFailed { error } => {
            vec![format!("{} Session cleanup failed: {}", "⚠".yellow(), error)]
        }
    }
}

fn print_status(controller: &SessionController) {
    let state = controller.snapshot();
    let now = Utc::now();

    println!("{}", "Session Status".cyan().bold());
    match &state.session_id {
        Some(id) => println!("  ID:       {}", id),
        None => println!("  ID:       {}", "(pending)".dimmed()),
    }

    let remaining = (state.expires_at - now).num_seconds();
    if remaining >= 0 {
        println!(
            "  Expires:  {} ({}s left)",
            local_time(state.expires_at),
            remaining
        );
    } else {
        println!("  Expires:  {}", "expired".red());
    }

    let monitor = controller.monitor();
    println!(
        "  Monitor:  {} ({} checks)",
        monitor.state(),
        monitor.firings()
    );
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  {}       extend the session", "refresh".cyan());
    println!("  {}   navigate (runs a connectivity check)", "open <view>".cyan());
    println!("  {}        show session and monitor state", "status".cyan());
    println!("  {}        log out (asks first)", "logout".cyan());
    println!("  {}          show this help", "help".cyan());
    println!();
}

fn short_id(session_id: &str) -> &str {
    session_id.get(..8).unwrap_or(session_id)
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}
