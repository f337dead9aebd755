// Address derivation command

use anyhow::Result;
use clap::Args;
use openstay_sdk::{prelude::Pubkey, PdaBuilder};

use super::{
    utils::{describe_release_time, info, parse_pubkey, parse_release_time},
    CliContext,
};

#[derive(Args)]
pub struct DeriveCmd {
    /// Guest account funding the escrow
    #[arg(long)]
    initializer: String,

    /// Host account receiving the payout
    #[arg(long)]
    beneficiary: String,

    /// Release time: unix seconds or local YYYY-MM-DDTHH:MM
    #[arg(long)]
    release: String,

    /// Program ID; read from config when omitted
    #[arg(long)]
    program_id: Option<String>,

    /// Stablecoin mint; read from config when omitted
    #[arg(long)]
    mint: Option<String>,
}

pub fn execute(cmd: DeriveCmd, ctx: &CliContext) -> Result<()> {
    let (program_id, mint) = match (&cmd.program_id, &cmd.mint) {
        (Some(program_id), Some(mint)) => (
            parse_pubkey("program", program_id)?,
            parse_pubkey("mint", mint)?,
        ),
        _ => {
            let config = ctx.load_config()?;
            let program_id = match &cmd.program_id {
                Some(id) => parse_pubkey("program", id)?,
                None => config.program_id,
            };
            let mint = match &cmd.mint {
                Some(mint) => parse_pubkey("mint", mint)?,
                None => config.mint,
            };
            (program_id, mint)
        }
    };

    let initializer = parse_pubkey("initializer", &cmd.initializer)?;
    let beneficiary = parse_pubkey("beneficiary", &cmd.beneficiary)?;
    let release_ts = parse_release_time(&cmd.release)?;

    let pda = PdaBuilder::new(program_id, mint);
    let key = pda.key(initializer, beneficiary, release_ts);
    let accounts = pda.escrow_accounts(&key)?;

    info(&format!("Release time: {}", describe_release_time(release_ts)));
    println!("escrow:                    {} (bump {})", accounts.escrow, accounts.bump);
    println!("vault:                     {}", accounts.vault);
    println!("initializer token account: {}", user_account(&pda, &initializer));
    println!("beneficiary token account: {}", user_account(&pda, &beneficiary));
    Ok(())
}

fn user_account(pda: &PdaBuilder, owner: &Pubkey) -> String {
    match pda.user_token_account(owner) {
        Ok(account) => account.to_string(),
        Err(_) => "none (owner is off curve)".to_string(),
    }
}
