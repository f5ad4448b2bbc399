//! CLI argument definitions using clap derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use vigil_core::ProbeMethod;

/// Session guard CLI
///
/// Keeps one timed session alive while the network stays healthy.
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a guarded session with an interactive command loop
    Run {
        /// User the session belongs to
        #[arg(short, long, env = "VIGIL_USER")]
        user: String,

        /// Keep session rows in memory instead of the SQLite store
        #[arg(long)]
        ephemeral: bool,
    },

    /// Probe a host once and classify the result
    Probe {
        /// Host to probe (defaults to the configured probe host)
        host: Option<String>,

        /// Probe method (defaults to the configured method)
        #[arg(short, long, value_enum)]
        method: Option<ProbeMethodArg>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Inspect stored sessions
    Sessions(SessionsCommand),

    /// Configuration file management
    Config(ConfigCommand),

    /// Show version
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeMethodArg {
    Tcp,
    Ping,
}

impl From<ProbeMethodArg> for ProbeMethod {
    fn from(arg: ProbeMethodArg) -> Self {
        match arg {
            ProbeMethodArg::Tcp => ProbeMethod::Tcp,
            ProbeMethodArg::Ping => ProbeMethod::Ping,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Store Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct SessionsCommand {
    #[command(subcommand)]
    pub action: SessionsAction,
}

#[derive(Subcommand, Debug)]
pub enum SessionsAction {
    /// List a user's sessions, newest first
    List {
        /// User ID
        #[arg(short, long, env = "VIGIL_USER")]
        user: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one session row
    Show {
        /// Session ID
        session_id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Print the config file path
    Path,
}
