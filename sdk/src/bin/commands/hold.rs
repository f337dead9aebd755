// Hold command: lock a booking payment in escrow

use anyhow::Result;
use clap::Args;
use openstay_sdk::{parse_amount, base_units_to_decimal, EscrowClient, HoldRequest, WalletProvider};

use super::{
    utils::{
        describe_release_time, error_with_logs, info, load_wallet, parse_pubkey,
        parse_release_time, success,
    },
    CliContext,
};

#[derive(Args)]
pub struct HoldCmd {
    /// Host account receiving the payout
    #[arg(long)]
    beneficiary: String,

    /// Decimal amount of the stablecoin, e.g. 120.50
    #[arg(long)]
    amount: String,

    /// Release time: unix seconds or local YYYY-MM-DDTHH:MM
    #[arg(long)]
    release: String,
}

pub async fn execute(cmd: HoldCmd, ctx: &CliContext) -> Result<()> {
    let config = ctx.load_config()?;
    let wallet = load_wallet(&ctx.wallet_path)?;
    let initializer = wallet
        .pubkey()
        .ok_or_else(|| anyhow::anyhow!("Wallet has no account"))?;

    let request = HoldRequest {
        initializer,
        beneficiary: parse_pubkey("beneficiary", &cmd.beneficiary)?,
        amount: parse_amount(&cmd.amount, config.mint_decimals)?,
        release_ts: parse_release_time(&cmd.release)?,
    };

    let client = EscrowClient::connect(&config)?;
    let key = client
        .pda()
        .key(request.initializer, request.beneficiary, request.release_ts);
    let (escrow, _) = client.pda().escrow(&key)?;

    info(&format!(
        "Holding {} until {}",
        base_units_to_decimal(request.amount.into(), config.mint_decimals),
        describe_release_time(request.release_ts)
    ));
    info(&format!("Escrow: {}", escrow));

    match client.hold(&wallet, &request).await {
        Ok(signature) => {
            success(&format!("Funds held. Signature: {}", signature));
            Ok(())
        }
        Err(e) => {
            error_with_logs(&e);
            Err(e.into())
        }
    }
}
