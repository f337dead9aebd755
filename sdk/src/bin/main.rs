// CLI tool for the OpenStay escrow
//
// Derives escrow addresses, encodes instruction payloads, and runs the hold
// and release flows with a local keypair as the signer.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::CliContext;

#[derive(Parser)]
#[command(name = "openstay")]
#[command(about = "OpenStay escrow CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file; OPENSTAY_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// RPC URL, overriding the configured one
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Path to wallet keypair file
    #[arg(long, global = true, default_value = "~/.config/solana/id.json")]
    wallet: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print escrow, vault and token account addresses for a booking
    Derive(commands::derive::DeriveCmd),

    /// Print instruction payload bytes
    Encode(commands::encode::EncodeCmd),

    /// Lock funds in escrow until the release time
    Hold(commands::hold::HoldCmd),

    /// Pay out an escrow to its beneficiary
    Release(commands::release::ReleaseCmd),
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("openstay_sdk={},openstay={}", default_level, default_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = CliContext {
        config_path: cli.config,
        rpc_url: cli.rpc_url,
        wallet_path: cli.wallet,
    };

    match cli.command {
        Commands::Derive(cmd) => commands::derive::execute(cmd, &ctx),
        Commands::Encode(cmd) => commands::encode::execute(cmd),
        Commands::Hold(cmd) => commands::hold::execute(cmd, &ctx).await,
        Commands::Release(cmd) => commands::release::execute(cmd, &ctx).await,
    }
}
