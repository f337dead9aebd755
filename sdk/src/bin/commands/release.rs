// Release command: pay out an escrow to its beneficiary

use anyhow::Result;
use clap::Args;
use openstay_sdk::{EscrowClient, ReleaseRequest};

use super::{
    utils::{
        describe_release_time, error_with_logs, info, load_wallet, parse_pubkey,
        parse_release_time, success, warn,
    },
    CliContext,
};

#[derive(Args)]
pub struct ReleaseCmd {
    /// Guest account that funded the escrow
    #[arg(long)]
    initializer: String,

    /// Host account receiving the payout
    #[arg(long)]
    beneficiary: String,

    /// Release time the escrow was opened with
    #[arg(long)]
    release: String,
}

pub async fn execute(cmd: ReleaseCmd, ctx: &CliContext) -> Result<()> {
    let config = ctx.load_config()?;
    let wallet = load_wallet(&ctx.wallet_path)?;

    let request = ReleaseRequest {
        initializer: parse_pubkey("initializer", &cmd.initializer)?,
        beneficiary: parse_pubkey("beneficiary", &cmd.beneficiary)?,
        release_ts: parse_release_time(&cmd.release)?,
    };

    let now = chrono::Utc::now().timestamp();
    if request.release_ts > now {
        // The program decides; submit anyway
        warn(&format!(
            "Release time {} has not passed yet",
            describe_release_time(request.release_ts)
        ));
    }

    let client = EscrowClient::connect(&config)?;
    let key = client
        .pda()
        .key(request.initializer, request.beneficiary, request.release_ts);
    info(&format!("Escrow: {}", client.pda().escrow(&key)?.0));

    match client.release(&wallet, &request).await {
        Ok(signature) => {
            success(&format!("Escrow released. Signature: {}", signature));
            Ok(())
        }
        Err(e) => {
            error_with_logs(&e);
            Err(e.into())
        }
    }
}
