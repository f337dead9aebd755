//! Transaction assembly: instruction ordering, fee payer, recent blockhash.

use solana_sdk::{hash::Hash, transaction::Transaction};
use tracing::debug;

use crate::{
    client::Ledger,
    instructions::{
        create_vault_idempotent, open_escrow, release_escrow, OpenEscrowAccounts,
        ReleaseEscrowAccounts,
    },
    prelude::*,
};

/// Recent blockhash plus the last block height at which it is accepted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreshnessToken {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Instructions waiting for a blockhash and a signature.
///
/// Consumed by [`PendingTransaction::freeze`]; a submitted transaction is
/// never rebuilt from the same value.
#[derive(Clone, Debug)]
pub struct PendingTransaction {
    fee_payer: Pubkey,
    instructions: Vec<Instruction>,
    freshness: Option<FreshnessToken>,
}

impl PendingTransaction {
    pub fn new(fee_payer: Pubkey) -> Self {
        Self {
            fee_payer,
            instructions: Vec::new(),
            freshness: None,
        }
    }

    pub fn with_instructions(fee_payer: Pubkey, instructions: Vec<Instruction>) -> Self {
        Self {
            fee_payer,
            instructions,
            freshness: None,
        }
    }

    /// Append an instruction; execution follows insertion order
    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn fee_payer(&self) -> Pubkey {
        self.fee_payer
    }

    pub fn freshness(&self) -> Option<FreshnessToken> {
        self.freshness
    }

    pub fn attach_freshness(&mut self, token: FreshnessToken) -> &mut Self {
        self.freshness = Some(token);
        self
    }

    /// Produce the unsigned transaction handed to the wallet
    pub fn freeze(self) -> SdkResult<(Transaction, FreshnessToken)> {
        let freshness = self.freshness.ok_or(SdkError::MissingFreshnessToken)?;
        let mut tx = Transaction::new_with_payer(&self.instructions, Some(&self.fee_payer));
        tx.message.recent_blockhash = freshness.blockhash;
        Ok((tx, freshness))
    }
}

/// `[create vault (idempotent), initialize]`; the vault must exist before the
/// program writes to it.
pub fn hold_instructions(
    program_id: Pubkey,
    accounts: &OpenEscrowAccounts,
    amount: u64,
    release_ts: i64,
) -> SdkResult<Vec<Instruction>> {
    Ok(vec![
        create_vault_idempotent(&accounts.initializer, &accounts.escrow, &accounts.mint),
        open_escrow(program_id, accounts, amount, release_ts)?,
    ])
}

pub fn release_instructions(
    program_id: Pubkey,
    accounts: &ReleaseEscrowAccounts,
) -> SdkResult<Vec<Instruction>> {
    Ok(vec![release_escrow(program_id, accounts)?])
}

/// Fail before any wallet prompt if the initializer cannot cover `required`
pub async fn check_initializer_balance(
    ledger: &dyn Ledger,
    account: &Pubkey,
    required: u64,
) -> SdkResult<u64> {
    let available = ledger
        .token_account_balance(account)
        .await
        .map_err(|e| match e {
            SdkError::TokenAccountUnavailable { .. } => e,
            other => SdkError::TokenAccountUnavailable {
                account: *account,
                reason: other.to_string(),
            },
        })?;

    debug!(%account, available, required, "initializer balance");
    if available < required {
        return Err(SdkError::InsufficientFunds {
            account: *account,
            available,
            required,
        });
    }
    Ok(available)
}

/// Attach a fresh blockhash fetched from the ledger
pub async fn attach_latest_freshness(
    ledger: &dyn Ledger,
    pending: &mut PendingTransaction,
) -> SdkResult<FreshnessToken> {
    let token = ledger.latest_freshness_token().await?;
    pending.attach_freshness(token);
    Ok(token)
}
