// Instruction payload encoding command

use anyhow::Result;
use clap::{Args, Subcommand};
use openstay_sdk::{core::DEFAULT_MINT_DECIMALS, parse_amount, EscrowInstruction};

use super::utils::parse_release_time;

#[derive(Args)]
pub struct EncodeCmd {
    #[command(subcommand)]
    command: EncodeSubcommand,
}

#[derive(Subcommand)]
enum EncodeSubcommand {
    /// Initialize payload: discriminator, amount, release time
    Open {
        /// Decimal amount, e.g. 120.50
        #[arg(long)]
        amount: String,

        /// Mint decimals
        #[arg(long, default_value_t = DEFAULT_MINT_DECIMALS)]
        decimals: u8,

        /// Release time: unix seconds or local YYYY-MM-DDTHH:MM
        #[arg(long)]
        release: String,
    },

    /// Release payload: discriminator only
    Release,
}

pub fn execute(cmd: EncodeCmd) -> Result<()> {
    let instruction = match cmd.command {
        EncodeSubcommand::Open {
            amount,
            decimals,
            release,
        } => EscrowInstruction::Open {
            amount: parse_amount(&amount, decimals)?,
            release_ts: parse_release_time(&release)?,
        },
        EncodeSubcommand::Release => EscrowInstruction::Release,
    };

    let data = instruction.data()?;
    let hex: String = data.iter().map(|b| format!("{:02x}", b)).collect();
    println!("{}", hex);
    Ok(())
}
