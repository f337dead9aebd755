use solana_sdk::pubkey::Pubkey;

/// Seeds for escrow PDAs
pub mod seeds {
    pub const ESCROW: &[u8] = b"escrow";
}

/// Instruction discriminators expected by the deployed escrow program
pub mod discriminators {
    pub const INITIALIZE: [u8; 8] = [0xaf, 0xaf, 0x6d, 0x1f, 0x0d, 0x98, 0x9b, 0xed];
    pub const RELEASE: [u8; 8] = [0xfd, 0xf9, 0x0f, 0xce, 0x1c, 0x7f, 0xc1, 0xf1];
}

/// Decimals of the settlement mint (USDC) unless configured otherwise
pub const DEFAULT_MINT_DECIMALS: u8 = 6;

/// Largest scale the amount codec accepts
pub const MAX_MINT_DECIMALS: u8 = 18;

/// Open payload: discriminator + u64 amount + i64 release timestamp
pub const OPEN_PAYLOAD_LEN: usize = 24;

/// Release payload: discriminator only
pub const RELEASE_PAYLOAD_LEN: usize = 8;

pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// SPL Token program
pub fn token_program_id() -> Pubkey {
    spl_token::id()
}

/// Associated Token Account program
pub fn associated_token_program_id() -> Pubkey {
    spl_associated_token_account::id()
}

/// System program
pub fn system_program_id() -> Pubkey {
    solana_sdk::system_program::id()
}
