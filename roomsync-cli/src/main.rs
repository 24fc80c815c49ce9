//! roomsync: keep Matrix rooms in step with LDAP groups.
//!
//! # Usage
//!
//! ```text
//! roomsync [--config <path>] [-v] sync [ARG] [--dry-run] [--json] [--requested-by <mxid>]
//! roomsync [--config <path>] [-v] check [ARG]
//! roomsync [--config <path>] [-v] roster [ARG] [--json]
//! roomsync [--config <path>] validate
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, roster::RosterArgs, sync::SyncArgs, validate::ValidateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "roomsync",
    version,
    about = "Reconcile Matrix rooms against LDAP group membership",
    long_about = None,
)]
struct Cli {
    /// Config file (default: ~/.roomsync/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log every read and write to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, name, invite, promote and publish every configured room.
    Sync(SyncArgs),

    /// Bind to the directory and list the members each room resolves to.
    Check(CheckArgs),

    /// Show the desired roster of every room without touching the homeserver.
    Roster(RosterArgs),

    /// Validate the config file and list every problem found.
    Validate(ValidateArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Sync(args) => args.run(config),
        Commands::Check(args) => args.run(config),
        Commands::Roster(args) => args.run(config),
        Commands::Validate(args) => args.run(config),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
