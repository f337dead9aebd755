//! Basic usage example for the OpenStay escrow SDK
//!
//! Derives the accounts of one booking and encodes its instructions without
//! touching the network.

use chrono::FixedOffset;
use openstay_sdk::{
    base_units_to_decimal, codec::local_datetime_to_unix_seconds_in, parse_amount,
    transaction::hold_instructions, EscrowConfig, EscrowInstruction, PdaBuilder, SdkError,
    SdkResult,
};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};

fn main() -> SdkResult<()> {
    println!("=== OpenStay Escrow SDK Basic Usage ===\n");

    let config = EscrowConfig::devnet(Pubkey::new_unique(), Keypair::new().pubkey());
    println!("RPC URL:    {}", config.rpc_url);
    println!("WS URL:     {}", config.ws_url());
    println!("Program ID: {}", config.program_id);

    let guest = Keypair::new().pubkey();
    let host = Keypair::new().pubkey();
    let amount = parse_amount("120.50", config.mint_decimals)?;
    let zone = FixedOffset::east_opt(3600)
        .ok_or_else(|| SdkError::InvalidDateTime("bad offset".to_string()))?;
    let release_ts = local_datetime_to_unix_seconds_in("2025-07-01T11:00", &zone)?;

    let pda = PdaBuilder::new(config.program_id, config.mint);
    let key = pda.key(guest, host, release_ts);
    let accounts = pda.escrow_accounts(&key)?;

    println!(
        "\nBooking: {} held until {}",
        base_units_to_decimal(amount.into(), config.mint_decimals),
        release_ts
    );
    println!("  Escrow: {} (bump {})", accounts.escrow, accounts.bump);
    println!("  Vault:  {}", accounts.vault);

    let open = pda.open_accounts(&key)?;
    let instructions = hold_instructions(config.program_id, &open, amount, release_ts)?;
    for ix in &instructions {
        println!(
            "  {} -> {} accounts, {} data bytes",
            ix.program_id,
            ix.accounts.len(),
            ix.data.len()
        );
    }

    let decoded = EscrowInstruction::decode(&instructions[1].data)?;
    println!("\nDecoded open payload: {:?}", decoded);
    Ok(())
}
