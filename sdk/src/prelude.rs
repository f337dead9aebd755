//! Prelude module for common imports

pub use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};

pub use crate::core::{SdkError, SdkResult};
