use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::instruction::Instruction;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

use crate::{
    core::{
        associated_token_program_id, discriminators, system_program_id, token_program_id,
        EscrowKey, OPEN_PAYLOAD_LEN, RELEASE_PAYLOAD_LEN,
    },
    impl_instruction,
    instructions::{EscrowInstructionBuilder, InstructionBuilder},
    prelude::*,
    protocol::EscrowAccounts,
};

/// Arguments of the program's `initialize` instruction
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitializeParams {
    /// Base units moved into the vault
    pub amount: u64,
    pub release_ts: i64,
}

impl_instruction!(InitializeParams, discriminators::INITIALIZE, OPEN_PAYLOAD_LEN);

/// `release` takes no arguments
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleaseParams {}

impl_instruction!(ReleaseParams, discriminators::RELEASE, RELEASE_PAYLOAD_LEN);

/// The two operations the escrow program understands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscrowInstruction {
    Open { amount: u64, release_ts: i64 },
    Release,
}

impl EscrowInstruction {
    pub fn data(&self) -> SdkResult<Vec<u8>> {
        match *self {
            EscrowInstruction::Open { amount, release_ts } => {
                InitializeParams { amount, release_ts }.build_data()
            }
            EscrowInstruction::Release => ReleaseParams {}.build_data(),
        }
    }

    /// Parse instruction data produced for this program
    pub fn decode(data: &[u8]) -> SdkResult<Self> {
        if data.len() < 8 {
            return Err(SdkError::SerializationError(format!(
                "instruction data is {} bytes, shorter than a discriminator",
                data.len()
            )));
        }
        let (disc, args) = data.split_at(8);
        if disc == discriminators::INITIALIZE {
            if data.len() != OPEN_PAYLOAD_LEN {
                return Err(SdkError::SerializationError(format!(
                    "initialize payload must be {} bytes, got {}",
                    OPEN_PAYLOAD_LEN,
                    data.len()
                )));
            }
            let params = InitializeParams::try_from_slice(args)
                .map_err(|e| SdkError::SerializationError(e.to_string()))?;
            Ok(EscrowInstruction::Open {
                amount: params.amount,
                release_ts: params.release_ts,
            })
        } else if disc == discriminators::RELEASE {
            if data.len() != RELEASE_PAYLOAD_LEN {
                return Err(SdkError::SerializationError(format!(
                    "release payload must be {} bytes, got {}",
                    RELEASE_PAYLOAD_LEN,
                    data.len()
                )));
            }
            Ok(EscrowInstruction::Release)
        } else {
            Err(SdkError::SerializationError(format!(
                "unknown discriminator {:02x?}",
                disc
            )))
        }
    }
}

/// Accounts of the `initialize` instruction
#[derive(Clone, Copy, Debug)]
pub struct OpenEscrowAccounts {
    pub initializer: Pubkey,
    pub beneficiary: Pubkey,
    pub mint: Pubkey,
    pub escrow: Pubkey,
    pub initializer_token_account: Pubkey,
    pub vault: Pubkey,
}

impl OpenEscrowAccounts {
    pub fn new(key: &EscrowKey, derived: &EscrowAccounts, initializer_token_account: Pubkey) -> Self {
        Self {
            initializer: key.initializer,
            beneficiary: key.beneficiary,
            mint: key.mint,
            escrow: derived.escrow,
            initializer_token_account,
            vault: derived.vault,
        }
    }
}

/// Accounts of the `release` instruction
#[derive(Clone, Copy, Debug)]
pub struct ReleaseEscrowAccounts {
    /// Whoever pays for the release; need not be the beneficiary
    pub payer: Pubkey,
    pub beneficiary: Pubkey,
    pub mint: Pubkey,
    pub escrow: Pubkey,
    pub vault: Pubkey,
    pub beneficiary_token_account: Pubkey,
}

impl ReleaseEscrowAccounts {
    pub fn new(
        payer: Pubkey,
        key: &EscrowKey,
        derived: &EscrowAccounts,
        beneficiary_token_account: Pubkey,
    ) -> Self {
        Self {
            payer,
            beneficiary: key.beneficiary,
            mint: key.mint,
            escrow: derived.escrow,
            vault: derived.vault,
            beneficiary_token_account,
        }
    }
}

/// Build the `initialize` instruction that moves `amount` into the vault
pub fn open_escrow(
    program_id: Pubkey,
    accounts: &OpenEscrowAccounts,
    amount: u64,
    release_ts: i64,
) -> SdkResult<Instruction> {
    let data = InitializeParams { amount, release_ts }.build_data()?;

    Ok(EscrowInstructionBuilder::new(program_id)
        .add_signer(accounts.initializer)
        .add_readonly(accounts.beneficiary)
        .add_readonly(accounts.mint)
        .add_writable(accounts.escrow)
        .add_writable(accounts.initializer_token_account)
        .add_writable(accounts.vault)
        .add_readonly(token_program_id())
        .add_readonly(associated_token_program_id())
        .add_readonly(system_program_id())
        .with_data(data)
        .build())
}

/// Build the `release` instruction paying the vault out to the beneficiary.
///
/// No time check happens here; the program enforces the release timestamp.
pub fn release_escrow(program_id: Pubkey, accounts: &ReleaseEscrowAccounts) -> SdkResult<Instruction> {
    let data = ReleaseParams {}.build_data()?;

    Ok(EscrowInstructionBuilder::new(program_id)
        .add_signer(accounts.payer)
        .add_readonly(accounts.beneficiary)
        .add_readonly(accounts.mint)
        .add_writable(accounts.escrow)
        .add_writable(accounts.vault)
        .add_writable(accounts.beneficiary_token_account)
        .add_readonly(token_program_id())
        .add_readonly(associated_token_program_id())
        .add_readonly(system_program_id())
        .with_data(data)
        .build())
}

/// Create the escrow's vault token account if it does not exist yet
pub fn create_vault_idempotent(payer: &Pubkey, escrow: &Pubkey, mint: &Pubkey) -> Instruction {
    create_associated_token_account_idempotent(payer, escrow, mint, &token_program_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_accounts() -> OpenEscrowAccounts {
        OpenEscrowAccounts {
            initializer: Pubkey::new_unique(),
            beneficiary: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            escrow: Pubkey::new_unique(),
            initializer_token_account: Pubkey::new_unique(),
            vault: Pubkey::new_unique(),
        }
    }

    fn flags(ix: &Instruction) -> Vec<(Pubkey, bool, bool)> {
        ix.accounts
            .iter()
            .map(|m| (m.pubkey, m.is_signer, m.is_writable))
            .collect()
    }

    #[test]
    fn test_open_payload_layout() {
        let data = EscrowInstruction::Open {
            amount: 120_000_000,
            release_ts: 1_767_225_600,
        }
        .data()
        .unwrap();

        assert_eq!(data.len(), OPEN_PAYLOAD_LEN);
        assert_eq!(&data[..8], &[0xaf, 0xaf, 0x6d, 0x1f, 0x0d, 0x98, 0x9b, 0xed]);
        assert_eq!(&data[8..16], &120_000_000u64.to_le_bytes());
        assert_eq!(&data[16..], &1_767_225_600i64.to_le_bytes());
    }

    #[test]
    fn test_release_payload_is_discriminator_only() {
        let data = EscrowInstruction::Release.data().unwrap();
        assert_eq!(data, vec![0xfd, 0xf9, 0x0f, 0xce, 0x1c, 0x7f, 0xc1, 0xf1]);
    }

    #[test]
    fn test_open_round_trip_boundaries() {
        let amounts = [0u64, 1, u64::MAX];
        let timestamps = [0i64, 1, -1, i64::MIN, i64::MAX];
        for &amount in &amounts {
            for &release_ts in &timestamps {
                let ix = EscrowInstruction::Open { amount, release_ts };
                let decoded = EscrowInstruction::decode(&ix.data().unwrap()).unwrap();
                assert_eq!(decoded, ix, "amount {} ts {}", amount, release_ts);
            }
        }
    }

    #[test]
    fn test_decode_rejects_malformed_payloads() {
        assert!(EscrowInstruction::decode(&[0xaf, 0xaf]).is_err());
        assert!(EscrowInstruction::decode(&[0u8; 24]).is_err());

        let mut open = EscrowInstruction::Open { amount: 5, release_ts: 6 }.data().unwrap();
        open.pop();
        assert!(EscrowInstruction::decode(&open).is_err());

        let mut release = EscrowInstruction::Release.data().unwrap();
        release.push(0);
        assert!(EscrowInstruction::decode(&release).is_err());
    }

    #[test]
    fn test_open_account_layout() {
        let program_id = Pubkey::new_unique();
        let a = open_accounts();
        let ix = open_escrow(program_id, &a, 42, 1_800_000_000).unwrap();

        assert_eq!(ix.program_id, program_id);
        assert_eq!(
            flags(&ix),
            vec![
                (a.initializer, true, true),
                (a.beneficiary, false, false),
                (a.mint, false, false),
                (a.escrow, false, true),
                (a.initializer_token_account, false, true),
                (a.vault, false, true),
                (spl_token::id(), false, false),
                (spl_associated_token_account::id(), false, false),
                (solana_sdk::system_program::id(), false, false),
            ]
        );
        assert_eq!(
            EscrowInstruction::decode(&ix.data).unwrap(),
            EscrowInstruction::Open {
                amount: 42,
                release_ts: 1_800_000_000
            }
        );
    }

    #[test]
    fn test_release_account_layout() {
        let program_id = Pubkey::new_unique();
        let a = ReleaseEscrowAccounts {
            payer: Pubkey::new_unique(),
            beneficiary: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            escrow: Pubkey::new_unique(),
            vault: Pubkey::new_unique(),
            beneficiary_token_account: Pubkey::new_unique(),
        };
        let ix = release_escrow(program_id, &a).unwrap();

        assert_eq!(
            flags(&ix),
            vec![
                (a.payer, true, true),
                (a.beneficiary, false, false),
                (a.mint, false, false),
                (a.escrow, false, true),
                (a.vault, false, true),
                (a.beneficiary_token_account, false, true),
                (spl_token::id(), false, false),
                (spl_associated_token_account::id(), false, false),
                (solana_sdk::system_program::id(), false, false),
            ]
        );
        assert_eq!(ix.data.len(), RELEASE_PAYLOAD_LEN);
    }

    #[test]
    fn test_vault_creation_targets_escrow_owner() {
        let payer = Pubkey::new_unique();
        let escrow = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let vault = spl_associated_token_account::get_associated_token_address(&escrow, &mint);

        let ix = create_vault_idempotent(&payer, &escrow, &mint);
        assert_eq!(ix.program_id, spl_associated_token_account::id());
        assert_eq!(ix.accounts[0].pubkey, payer);
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[1].pubkey, vault);
        assert_eq!(ix.accounts[2].pubkey, escrow);
        assert_eq!(ix.accounts[3].pubkey, mint);
        // CreateIdempotent
        assert_eq!(ix.data, vec![1]);
    }
}
