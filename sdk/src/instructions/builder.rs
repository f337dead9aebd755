use borsh::BorshSerialize;
use solana_sdk::instruction::{AccountMeta, Instruction};

use crate::prelude::*;

/// Payload encoding for the escrow program's two instructions.
///
/// Implemented for `InitializeParams` and `ReleaseParams` only, each bound to
/// its entry in [`crate::core::discriminators`] and to the fixed payload
/// length the program expects.
pub trait InstructionBuilder: BorshSerialize {
    /// `initialize` or `release` discriminator
    const DISCRIMINATOR: [u8; 8];
    /// Discriminator plus Borsh arguments, in bytes
    const PAYLOAD_LEN: usize;

    /// Discriminator followed by the Borsh-encoded arguments
    fn build_data(&self) -> SdkResult<Vec<u8>> {
        let mut data = Self::DISCRIMINATOR.to_vec();
        data.extend_from_slice(
            &self
                .try_to_vec()
                .map_err(|e| SdkError::SerializationError(e.to_string()))?,
        );
        if data.len() != Self::PAYLOAD_LEN {
            return Err(SdkError::SerializationError(format!(
                "payload is {} bytes, expected {}",
                data.len(),
                Self::PAYLOAD_LEN
            )));
        }
        Ok(data)
    }
}

/// Builder for constructing escrow program instructions.
///
/// Accounts are emitted in push order; the program reads them positionally.
pub struct EscrowInstructionBuilder {
    program_id: Pubkey,
    accounts: Vec<AccountMeta>,
    data: Vec<u8>,
}

impl EscrowInstructionBuilder {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            accounts: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Add a writable signer account
    pub fn add_signer(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new(pubkey, true));
        self
    }

    /// Add a writable non-signer account
    pub fn add_writable(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new(pubkey, false));
        self
    }

    /// Add a readonly account
    pub fn add_readonly(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new_readonly(pubkey, false));
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn build(self) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: self.accounts,
            data: self.data,
        }
    }
}

/// Bind an escrow params struct to its discriminator and payload length,
/// e.g. `impl_instruction!(ReleaseParams, discriminators::RELEASE, RELEASE_PAYLOAD_LEN)`
#[macro_export]
macro_rules! impl_instruction {
    ($name:ident, $discriminator:expr, $payload_len:expr) => {
        impl $crate::instructions::InstructionBuilder for $name {
            const DISCRIMINATOR: [u8; 8] = $discriminator;
            const PAYLOAD_LEN: usize = $payload_len;
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{discriminators, OPEN_PAYLOAD_LEN, RELEASE_PAYLOAD_LEN},
        instructions::{InitializeParams, ReleaseParams},
    };

    #[derive(BorshSerialize)]
    struct Oversized {
        extra: u64,
    }

    crate::impl_instruction!(Oversized, discriminators::RELEASE, RELEASE_PAYLOAD_LEN);

    #[test]
    fn test_params_carry_escrow_discriminators() {
        assert_eq!(InitializeParams::DISCRIMINATOR, discriminators::INITIALIZE);
        assert_eq!(InitializeParams::PAYLOAD_LEN, OPEN_PAYLOAD_LEN);
        assert_eq!(ReleaseParams::DISCRIMINATOR, discriminators::RELEASE);
        assert_eq!(ReleaseParams::PAYLOAD_LEN, RELEASE_PAYLOAD_LEN);

        let data = InitializeParams {
            amount: 7,
            release_ts: 9,
        }
        .build_data()
        .unwrap();
        assert_eq!(&data[..8], &discriminators::INITIALIZE);
        assert_eq!(data.len(), OPEN_PAYLOAD_LEN);
    }

    #[test]
    fn test_payload_length_is_enforced() {
        assert!(matches!(
            Oversized { extra: 1 }.build_data(),
            Err(SdkError::SerializationError(_))
        ));
    }

    #[test]
    fn test_account_flags_follow_push_order() {
        let program_id = Pubkey::new_unique();
        let (a, b, c) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let ix = EscrowInstructionBuilder::new(program_id)
            .add_signer(a)
            .add_readonly(b)
            .add_writable(c)
            .with_data(vec![1, 2, 3])
            .build();

        assert_eq!(ix.program_id, program_id);
        assert_eq!(ix.data, vec![1, 2, 3]);
        let flags: Vec<_> = ix
            .accounts
            .iter()
            .map(|m| (m.pubkey, m.is_signer, m.is_writable))
            .collect();
        assert_eq!(flags, vec![(a, true, true), (b, false, false), (c, false, true)]);
    }
}
