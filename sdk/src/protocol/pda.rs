use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address_with_program_id;

use crate::{
    core::{seeds, token_program_id, EscrowKey, SdkError, SdkResult},
    instructions::{OpenEscrowAccounts, ReleaseEscrowAccounts},
};

/// Addresses owned by the escrow itself
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EscrowAccounts {
    pub escrow: Pubkey,
    pub bump: u8,
    /// Token account owned by the escrow PDA
    pub vault: Pubkey,
}

/// Derives escrow addresses for one program and settlement mint.
///
/// Holds no mutable state; one builder may serve any number of concurrent
/// flows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PdaBuilder {
    pub program_id: Pubkey,
    pub mint: Pubkey,
}

impl PdaBuilder {
    pub fn new(program_id: Pubkey, mint: Pubkey) -> Self {
        Self { program_id, mint }
    }

    /// Escrow key for this builder's mint
    pub fn key(&self, initializer: Pubkey, beneficiary: Pubkey, release_ts: i64) -> EscrowKey {
        EscrowKey::new(initializer, beneficiary, self.mint, release_ts)
    }

    pub fn escrow(&self, key: &EscrowKey) -> SdkResult<(Pubkey, u8)> {
        find_escrow_address(
            &key.initializer,
            &key.beneficiary,
            &key.mint,
            key.release_ts,
            &self.program_id,
        )
    }

    /// Token account of the escrow PDA for `key.mint`
    pub fn vault(&self, key: &EscrowKey) -> SdkResult<Pubkey> {
        let (escrow, _) = self.escrow(key)?;
        find_token_account(&escrow, &key.mint, true)
    }

    pub fn user_token_account(&self, owner: &Pubkey) -> SdkResult<Pubkey> {
        find_token_account(owner, &self.mint, false)
    }

    pub fn escrow_accounts(&self, key: &EscrowKey) -> SdkResult<EscrowAccounts> {
        let (escrow, bump) = self.escrow(key)?;
        Ok(EscrowAccounts {
            escrow,
            bump,
            vault: find_token_account(&escrow, &key.mint, true)?,
        })
    }

    /// Accounts of `initialize`. The beneficiary is referenced only by
    /// address, so it may be any account, PDAs included.
    pub fn open_accounts(&self, key: &EscrowKey) -> SdkResult<OpenEscrowAccounts> {
        let derived = self.escrow_accounts(key)?;
        let initializer_token_account = find_token_account(&key.initializer, &key.mint, false)?;
        Ok(OpenEscrowAccounts::new(key, &derived, initializer_token_account))
    }

    /// Accounts of `release` paid by `payer`
    pub fn release_accounts(
        &self,
        payer: Pubkey,
        key: &EscrowKey,
    ) -> SdkResult<ReleaseEscrowAccounts> {
        let derived = self.escrow_accounts(key)?;
        let beneficiary_token_account = find_token_account(&key.beneficiary, &key.mint, false)?;
        Ok(ReleaseEscrowAccounts::new(
            payer,
            key,
            &derived,
            beneficiary_token_account,
        ))
    }
}

/// Derive the escrow PDA.
///
/// Seeds: `["escrow", initializer, beneficiary, mint, release_ts as i64 LE]`.
/// Bumps are tried from 255 downward and the first off-curve hit wins, which
/// is the address the program itself derives.
pub fn find_escrow_address(
    initializer: &Pubkey,
    beneficiary: &Pubkey,
    mint: &Pubkey,
    release_ts: i64,
    program_id: &Pubkey,
) -> SdkResult<(Pubkey, u8)> {
    let release_ts = release_ts.to_le_bytes();
    Pubkey::try_find_program_address(
        &[
            seeds::ESCROW,
            initializer.as_ref(),
            beneficiary.as_ref(),
            mint.as_ref(),
            &release_ts,
        ],
        program_id,
    )
    .ok_or_else(|| SdkError::DerivationExhausted {
        seed: String::from_utf8_lossy(seeds::ESCROW).into_owned(),
        program_id: *program_id,
    })
}

/// Associated token account of `owner` for `mint`.
///
/// PDA owners (the escrow vault) are off curve and need `allow_off_curve`;
/// for user wallets it must be false so a PDA is never mistaken for a user.
pub fn find_token_account(owner: &Pubkey, mint: &Pubkey, allow_off_curve: bool) -> SdkResult<Pubkey> {
    if !allow_off_curve && !owner.is_on_curve() {
        return Err(SdkError::invalid_address(
            "Token account owner (off curve)",
            owner.to_string(),
        ));
    }
    Ok(get_associated_token_address_with_program_id(
        owner,
        mint,
        &token_program_id(),
    ))
}

/// Parse a base-58 address, naming the field in the error
pub fn parse_address(label: &str, value: &str) -> SdkResult<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|_| SdkError::invalid_address(label, value))
}
