//! Escrow client: hold and release flows end to end.

pub mod base;
pub mod confirm;
pub mod dispatch;

pub use base::*;
pub use confirm::*;
pub use dispatch::*;

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::{
    config::EscrowConfig,
    core::{HoldRequest, ReleaseRequest},
    prelude::*,
    protocol::PdaBuilder,
    transaction::{
        attach_latest_freshness, check_initializer_balance, hold_instructions,
        release_instructions, PendingTransaction,
    },
    wallet::{active_account, SigningCapability, WalletProvider},
};

/// Builds, signs, submits and confirms escrow transactions
pub struct EscrowClient {
    ledger: Arc<dyn Ledger>,
    pda: PdaBuilder,
    monitor: ConfirmationMonitor,
}

impl EscrowClient {
    pub fn new(ledger: Arc<dyn Ledger>, config: &EscrowConfig) -> SdkResult<Self> {
        config.validate()?;
        Ok(Self {
            ledger,
            pda: PdaBuilder::new(config.program_id, config.mint),
            monitor: ConfirmationMonitor::from_config(config)?,
        })
    }

    /// Client over a JSON-RPC node described by `config`
    pub fn connect(config: &EscrowConfig) -> SdkResult<Self> {
        let ledger = RpcLedger::from_config(config)?;
        Self::new(Arc::new(ledger), config)
    }

    pub fn with_monitor(mut self, monitor: ConfirmationMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn pda(&self) -> &PdaBuilder {
        &self.pda
    }

    pub fn program_id(&self) -> Pubkey {
        self.pda.program_id
    }

    pub fn mint(&self) -> Pubkey {
        self.pda.mint
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    pub fn monitor(&self) -> &ConfirmationMonitor {
        &self.monitor
    }

    /// Balance-checked hold transaction, ready to sign.
    ///
    /// Fails with `InsufficientFunds` before any blockhash is fetched.
    pub async fn prepare_hold(&self, request: &HoldRequest) -> SdkResult<PendingTransaction> {
        let key = self
            .pda
            .key(request.initializer, request.beneficiary, request.release_ts);
        let accounts = self.pda.open_accounts(&key)?;
        debug!(escrow = %accounts.escrow, vault = %accounts.vault, "derived escrow accounts");

        check_initializer_balance(
            self.ledger(),
            &accounts.initializer_token_account,
            request.amount,
        )
        .await?;

        let instructions = hold_instructions(
            self.program_id(),
            &accounts,
            request.amount,
            request.release_ts,
        )?;
        let mut pending = PendingTransaction::with_instructions(request.initializer, instructions);
        attach_latest_freshness(self.ledger(), &mut pending).await?;
        Ok(pending)
    }

    /// Release transaction paid by `payer`; the program enforces the release time
    pub async fn prepare_release(
        &self,
        payer: Pubkey,
        request: &ReleaseRequest,
    ) -> SdkResult<PendingTransaction> {
        let key = self
            .pda
            .key(request.initializer, request.beneficiary, request.release_ts);
        let accounts = self.pda.release_accounts(payer, &key)?;
        debug!(escrow = %accounts.escrow, %payer, "derived escrow accounts");

        let instructions = release_instructions(self.program_id(), &accounts)?;
        let mut pending = PendingTransaction::with_instructions(payer, instructions);
        attach_latest_freshness(self.ledger(), &mut pending).await?;
        Ok(pending)
    }

    /// Lock `request.amount` in the escrow vault until `request.release_ts`
    #[instrument(skip_all, fields(initializer = %request.initializer, amount = request.amount))]
    pub async fn hold(
        &self,
        wallet: &dyn WalletProvider,
        request: &HoldRequest,
    ) -> SdkResult<Signature> {
        let capabilities = wallet.capabilities();
        let capability = SigningCapability::resolve(&capabilities)?;
        let pending = self.prepare_hold(request).await?;
        let signature = self.submit(capability, pending).await?;
        info!(%signature, "hold confirmed");
        Ok(signature)
    }

    /// Pay out the vault to the beneficiary
    #[instrument(skip_all, fields(beneficiary = %request.beneficiary, release_ts = request.release_ts))]
    pub async fn release(
        &self,
        wallet: &dyn WalletProvider,
        request: &ReleaseRequest,
    ) -> SdkResult<Signature> {
        let capabilities = wallet.capabilities();
        let capability = SigningCapability::resolve(&capabilities)?;
        let payer = active_account(wallet).await?;
        let pending = self.prepare_release(payer, request).await?;
        let signature = self.submit(capability, pending).await?;
        info!(%signature, "release confirmed");
        Ok(signature)
    }

    async fn submit(
        &self,
        capability: SigningCapability<'_>,
        pending: PendingTransaction,
    ) -> SdkResult<Signature> {
        let (tx, freshness) = pending.freeze()?;
        let signature = dispatch(self.ledger(), capability, tx).await?;
        self.monitor
            .await_finality(self.ledger(), &signature, &freshness)
            .await?;
        Ok(signature)
    }
}
