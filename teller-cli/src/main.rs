//! Teller CLI - encrypted-balance ledger in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::{contacts, history, lookup, profile, register, transfer};

/// Teller - move money between encrypted-balance accounts
#[derive(Parser)]
#[command(name = "teller", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new account with the configured starting balance
    Register {
        /// Account holder's name
        #[arg(long)]
        name: String,
        /// Email address (must be unique)
        #[arg(long)]
        email: String,
        /// 8-digit phone number, separators allowed
        #[arg(long)]
        phone: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an account's profile and current balance
    Profile {
        /// Account ID
        account_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find an account by phone number
    Lookup {
        /// Phone number, e.g. 9123-1234
        phone: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Transfer money between two accounts
    Transfer {
        /// Sender account ID
        #[arg(long)]
        from: String,
        /// Recipient account ID
        #[arg(long, required_unless_present = "to_phone", conflicts_with = "to_phone")]
        to: Option<String>,
        /// Recipient phone number, resolved through lookup
        #[arg(long)]
        to_phone: Option<String>,
        /// Amount in dollars
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
        /// Key that makes retrying this transfer safe
        #[arg(long)]
        idempotency_key: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List recent transfers for an account
    History {
        /// Account ID
        account_id: String,
        /// Number of entries (1-50, default 10)
        #[arg(long, short = 'n')]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage saved contacts
    Contacts {
        #[command(subcommand)]
        command: contacts::ContactCommands,
    },
}

/// Log to stderr; RUST_LOG overrides the default `warn` level
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<output::AlreadyReported>().is_some() => ExitCode::FAILURE,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register { name, email, phone, json } => register::run(name, email, phone, json).await,
        Commands::Profile { account_id, json } => profile::run(&account_id, json).await,
        Commands::Lookup { phone, json } => lookup::run(&phone, json).await,
        Commands::Transfer { from, to, to_phone, amount, idempotency_key, json } => {
            transfer::run(from, to, to_phone, amount, idempotency_key, json).await
        }
        Commands::History { account_id, limit, json } => history::run(&account_id, limit, json).await,
        Commands::Contacts { command } => contacts::run(command).await,
    }
}
