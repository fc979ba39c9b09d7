//! Relay CLI - Command-line interface
//!
//! Drives the relay the way a playback engine would, for checking an origin
//! before pointing a player at it.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use relay_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relays media byte ranges from an HTTP origin")]
struct Cli {
    /// Console log level (RUST_LOG takes precedence)
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    /// Also write a full trace of this run into DIR
    #[arg(long, global = true, value_name = "DIR")]
    logs_dir: Option<PathBuf>,

    #[command(flatten)]
    origin: commands::OriginArgs,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())?;

    commands::handle_command(cli.command, &cli.origin).await
}
