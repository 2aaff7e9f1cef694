//! Morasel CLI - manage WhatsApp campaigns from the terminal.
//!
//! Every subcommand restores the stored session first, then talks to the
//! backend through `morasel-core`.

mod commands;
mod utils;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use morasel_core::models::{ProtectionType, TransactionType};
use morasel_core::{App, Config};

// ============================================================================
// Constants
// ============================================================================

/// Log file prefix inside the data directory
const LOG_FILE_PREFIX: &str = "morasel.log";

/// How long `channels watch` waits for the QR scan by default (seconds)
const DEFAULT_WATCH_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "morasel", version, about = "WhatsApp campaign automation from the terminal")]
struct Cli {
    /// Override the API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Write logs to a daily rolling file in the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Read from the prompt when omitted
        #[arg(long, env = "MORASEL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long, env = "MORASEL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Dashboard totals, points and channel status
    Stats,
    /// WhatsApp channels
    Channels {
        #[command(subcommand)]
        action: ChannelCommand,
    },
    /// Campaign recipients
    Contacts {
        #[command(subcommand)]
        action: ContactCommand,
    },
    /// Bulk sends
    Campaigns {
        #[command(subcommand)]
        action: CampaignCommand,
    },
    /// Points wallet
    Points {
        #[command(subcommand)]
        action: PointsCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ChannelCommand {
    List,
    /// Create a channel and wait for its QR code to be scanned
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        /// Return right after creation instead of waiting
        #[arg(long)]
        no_wait: bool,
    },
    Show {
        id: String,
    },
    Delete {
        id: String,
    },
    /// Poll a channel until it is connected
    Watch {
        id: String,
        #[arg(long, default_value_t = DEFAULT_WATCH_TIMEOUT_SECS)]
        timeout_secs: u64,
    },
}

#[derive(Debug, Subcommand)]
enum ContactCommand {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        notes: Option<String>,
        /// Channel to link; repeatable
        #[arg(long = "channel")]
        channels: Vec<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete {
        id: String,
    },
    /// Delete every contact
    Clear {
        /// Required to confirm
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum CampaignCommand {
    List,
    Show {
        id: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        channel: String,
        /// Recipient contact id; repeatable
        #[arg(long = "contact", required = true)]
        contacts: Vec<String>,
        /// Image sent with the message
        #[arg(long)]
        image: Option<PathBuf>,
        /// Send the image after the text instead of before it
        #[arg(long)]
        image_last: bool,
        #[arg(long)]
        no_protection: bool,
        #[arg(long)]
        protection: Option<ProtectionType>,
        /// Seconds between messages
        #[arg(long)]
        delay: Option<String>,
        #[arg(long)]
        batch_size: Option<String>,
        /// Seconds between batches
        #[arg(long)]
        batch_delay: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
enum PointsCommand {
    Balance,
    Stats,
    Transactions {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        /// admin_add, admin_deduct or campaign_deduct
        #[arg(long = "type")]
        kind: Option<TransactionType>,
    },
}

// ============================================================================
// Entry point
// ============================================================================

/// Initialize the tracing subscriber for logging.
/// Returns the appender guard when logging to a file; keep it alive until exit.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: ignoring unreadable config: {e:#}");
        Config::default()
    });
    if let Some(ref url) = cli.api_url {
        config.api_base_url = url.clone();
    }

    let log_dir = if cli.log_file {
        Some(config.data_dir()?)
    } else {
        None
    };
    let _guard = init_tracing(log_dir);
    debug!(api = %config.api_base_url, backend = ?config.credential_backend, "Starting");

    let app = App::from_config(&config)?;
    let outcome = app.restore().await;
    debug!(?outcome, "Session restored");

    let output = commands::Output { json: cli.json };
    let result = commands::run(&app, &mut config, cli.command, output).await;

    if let Err(ref e) = result {
        warn!(error = %e, "Command failed");
    }
    result
}
