//! Wallet capabilities and the signer selection rule.
//!
//! A wallet may expose a sign-and-submit capability, a sign-only capability,
//! both, or neither. [`SigningCapability::resolve`] picks one per transaction.

use std::path::Path;

use async_trait::async_trait;
use solana_sdk::{
    signature::{read_keypair_file, Keypair},
    signer::Signer,
    transaction::Transaction,
};
use thiserror::Error;

use crate::prelude::*;

/// Failure reported by a wallet capability
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// The user declined; the message is surfaced verbatim
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Failed(String),
}

impl From<WalletError> for SdkError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected(message) => SdkError::SignerRejected(message),
            WalletError::Failed(reason) => SdkError::SubmissionFailed {
                reason,
                logs: Vec::new(),
            },
        }
    }
}

/// Signs and broadcasts in one step, returning the signature
#[async_trait]
pub trait SignAndSubmit: Send + Sync {
    async fn sign_and_submit(&self, tx: Transaction) -> Result<Signature, WalletError>;
}

/// Signs only; the caller submits the serialized result
#[async_trait]
pub trait SignOnly: Send + Sync {
    async fn sign_transaction(&self, tx: Transaction) -> Result<Transaction, WalletError>;
}

#[derive(Clone, Copy, Default)]
pub struct WalletCapabilities<'a> {
    pub sign_and_submit: Option<&'a dyn SignAndSubmit>,
    pub sign_only: Option<&'a dyn SignOnly>,
}

impl WalletCapabilities<'_> {
    pub fn is_empty(&self) -> bool {
        self.sign_and_submit.is_none() && self.sign_only.is_none()
    }
}

impl std::fmt::Debug for WalletCapabilities<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletCapabilities")
            .field("sign_and_submit", &self.sign_and_submit.is_some())
            .field("sign_only", &self.sign_only.is_some())
            .finish()
    }
}

/// The capability chosen for one transaction
#[derive(Clone, Copy)]
pub enum SigningCapability<'a> {
    SignAndSubmit(&'a dyn SignAndSubmit),
    SignOnly(&'a dyn SignOnly),
}

impl<'a> SigningCapability<'a> {
    /// Sign-and-submit wins when both are offered
    pub fn resolve(capabilities: &WalletCapabilities<'a>) -> SdkResult<Self> {
        if let Some(wallet) = capabilities.sign_and_submit {
            return Ok(Self::SignAndSubmit(wallet));
        }
        if let Some(wallet) = capabilities.sign_only {
            return Ok(Self::SignOnly(wallet));
        }
        Err(SdkError::SignerUnavailable)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SignAndSubmit(_) => "sign_and_submit",
            Self::SignOnly(_) => "sign_only",
        }
    }
}

/// Account changes reported by the wallet between operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountChanged(Option<Pubkey>),
    Disconnected,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Currently connected account, if any
    fn pubkey(&self) -> Option<Pubkey>;

    async fn connect(&self) -> Result<Pubkey, WalletError>;

    fn capabilities(&self) -> WalletCapabilities<'_>;

    /// Drain pending account events
    fn poll_events(&self) -> Vec<WalletEvent> {
        Vec::new()
    }
}

/// Connected account, connecting first when none is active
pub async fn active_account(wallet: &dyn WalletProvider) -> SdkResult<Pubkey> {
    match wallet.pubkey() {
        Some(pubkey) => Ok(pubkey),
        None => Ok(wallet.connect().await?),
    }
}

/// Local keypair exposing only the sign-only capability
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn from_file(path: &Path) -> SdkResult<Self> {
        let keypair = read_keypair_file(path).map_err(|e| {
            SdkError::ConfigurationError(format!(
                "Failed to read keypair from {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(keypair))
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

#[async_trait]
impl SignOnly for KeypairWallet {
    async fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction, WalletError> {
        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| WalletError::Failed(e.to_string()))?;
        Ok(tx)
    }
}

#[async_trait]
impl WalletProvider for KeypairWallet {
    fn pubkey(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    async fn connect(&self) -> Result<Pubkey, WalletError> {
        Ok(self.keypair.pubkey())
    }

    fn capabilities(&self) -> WalletCapabilities<'_> {
        WalletCapabilities {
            sign_and_submit: None,
            sign_only: Some(self),
        }
    }
}
