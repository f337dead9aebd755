/// OpenStay escrow SDK
///
/// Client library for the time-locked booking escrow program.
/// Provides:
/// - Escrow, vault and token account derivation
/// - Instruction encoding for open and release
/// - Transaction assembly and wallet signer dispatch
/// - Confirmation monitoring with program log capture
/// - Stablecoin amount and local date-time conversion
pub mod client;
pub mod codec;
pub mod config;
pub mod core;
pub mod instructions;
pub mod prelude;
pub mod protocol;
#[cfg(feature = "server-assisted")]
pub mod server;
pub mod testing;
pub mod transaction;
pub mod wallet;

pub use client::{ConfirmationMonitor, EscrowClient, Ledger, RpcLedger};
pub use codec::*;
pub use config::EscrowConfig;
pub use crate::core::*;
pub use instructions::{EscrowInstruction, InstructionBuilder};
pub use protocol::{EscrowAccounts, PdaBuilder};
pub use transaction::{FreshnessToken, PendingTransaction};
pub use wallet::{
    KeypairWallet, SignAndSubmit, SignOnly, SigningCapability, WalletCapabilities, WalletError,
    WalletEvent, WalletProvider,
};
