//! In-memory ledger and wallet doubles for exercising the escrow flows
//! without a node.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    signature::Keypair,
    signer::Signer,
    transaction::{Transaction, TransactionError},
};

use crate::{
    client::Ledger,
    prelude::*,
    transaction::FreshnessToken,
    wallet::{SignAndSubmit, SignOnly, WalletCapabilities, WalletError, WalletEvent, WalletProvider},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One answer to a signature status poll
#[derive(Clone, Debug)]
pub enum ScriptedStatus {
    Pending,
    Confirmed,
    Failed(TransactionError),
    RpcError(String),
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Pubkey, u64>,
    statuses: VecDeque<ScriptedStatus>,
    logs: Vec<String>,
    log_fetch_fails: bool,
    submission_failure: Option<String>,
    submitted: Vec<Transaction>,
    block_height: u64,
}

/// Scriptable [`Ledger`].
///
/// Status polls replay the scripted list; the last entry repeats once
/// reached. With nothing scripted every poll reports pending.
pub struct MockLedger {
    state: Mutex<LedgerState>,
    freshness: FreshnessToken,
    balance_reads: AtomicUsize,
    freshness_fetches: AtomicUsize,
    status_polls: AtomicUsize,
    log_fetches: AtomicUsize,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            freshness: FreshnessToken {
                blockhash: Hash::new_unique(),
                last_valid_block_height: 150,
            },
            balance_reads: AtomicUsize::new(0),
            freshness_fetches: AtomicUsize::new(0),
            status_polls: AtomicUsize::new(0),
            log_fetches: AtomicUsize::new(0),
        }
    }

    pub fn freshness(&self) -> FreshnessToken {
        self.freshness
    }

    pub fn set_token_balance(&self, account: Pubkey, amount: u64) {
        lock(&self.state).balances.insert(account, amount);
    }

    pub fn script_statuses(&self, statuses: Vec<ScriptedStatus>) {
        lock(&self.state).statuses = statuses.into();
    }

    pub fn set_logs(&self, logs: Vec<String>) {
        lock(&self.state).logs = logs;
    }

    pub fn fail_log_fetch(&self) {
        lock(&self.state).log_fetch_fails = true;
    }

    pub fn fail_submission(&self, reason: impl Into<String>) {
        lock(&self.state).submission_failure = Some(reason.into());
    }

    pub fn set_block_height(&self, height: u64) {
        lock(&self.state).block_height = height;
    }

    /// Transactions received through [`Ledger::submit_raw_transaction`]
    pub fn submitted(&self) -> Vec<Transaction> {
        lock(&self.state).submitted.clone()
    }

    pub fn balance_reads(&self) -> usize {
        self.balance_reads.load(Ordering::SeqCst)
    }

    pub fn freshness_fetches(&self) -> usize {
        self.freshness_fetches.load(Ordering::SeqCst)
    }

    pub fn status_polls(&self) -> usize {
        self.status_polls.load(Ordering::SeqCst)
    }

    pub fn log_fetches(&self) -> usize {
        self.log_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn token_account_balance(&self, address: &Pubkey) -> SdkResult<u64> {
        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        lock(&self.state)
            .balances
            .get(address)
            .copied()
            .ok_or_else(|| SdkError::TokenAccountUnavailable {
                account: *address,
                reason: "account does not exist".to_string(),
            })
    }

    async fn latest_freshness_token(&self) -> SdkResult<FreshnessToken> {
        self.freshness_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.freshness)
    }

    async fn submit_raw_transaction(&self, wire: &[u8]) -> SdkResult<Signature> {
        let tx: Transaction = bincode::deserialize(wire)?;
        let mut state = lock(&self.state);
        if let Some(reason) = state.submission_failure.clone() {
            return Err(SdkError::SubmissionFailed {
                reason,
                logs: state.logs.clone(),
            });
        }
        if tx.verify().is_err() {
            return Err(SdkError::SubmissionFailed {
                reason: "signature verification failure".to_string(),
                logs: Vec::new(),
            });
        }
        let signature = tx
            .signatures
            .first()
            .copied()
            .ok_or_else(|| SdkError::SubmissionFailed {
                reason: "transaction has no signatures".to_string(),
                logs: Vec::new(),
            })?;
        state.submitted.push(tx);
        Ok(signature)
    }

    async fn signature_status(
        &self,
        _signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> SdkResult<Option<Result<(), TransactionError>>> {
        self.status_polls.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state);
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().cloned()
        };
        match status.unwrap_or(ScriptedStatus::Pending) {
            ScriptedStatus::Pending => Ok(None),
            ScriptedStatus::Confirmed => Ok(Some(Ok(()))),
            ScriptedStatus::Failed(err) => Ok(Some(Err(err))),
            ScriptedStatus::RpcError(message) => Err(SdkError::RpcError(message)),
        }
    }

    async fn block_height(&self, _commitment: CommitmentConfig) -> SdkResult<u64> {
        Ok(lock(&self.state).block_height)
    }

    async fn transaction_logs(&self, signature: &Signature) -> SdkResult<Vec<String>> {
        self.log_fetches.fetch_add(1, Ordering::SeqCst);
        let state = lock(&self.state);
        if state.log_fetch_fails {
            return Err(SdkError::RpcError(format!("Transaction {} not found", signature)));
        }
        Ok(state.logs.clone())
    }
}

/// Wallet double backed by a real keypair.
///
/// Capabilities are chosen at construction; a rejection message makes every
/// signing request fail with that text.
pub struct MockWallet {
    keypair: Keypair,
    connected: Mutex<bool>,
    offers_sign_and_submit: bool,
    offers_sign_only: bool,
    rejection: Mutex<Option<String>>,
    events: Mutex<Vec<WalletEvent>>,
    signed: Mutex<Vec<Transaction>>,
    connect_calls: AtomicUsize,
    sign_and_submit_calls: AtomicUsize,
    sign_only_calls: AtomicUsize,
}

impl MockWallet {
    fn build(sign_and_submit: bool, sign_only: bool) -> Self {
        Self {
            keypair: Keypair::new(),
            connected: Mutex::new(true),
            offers_sign_and_submit: sign_and_submit,
            offers_sign_only: sign_only,
            rejection: Mutex::new(None),
            events: Mutex::new(Vec::new()),
            signed: Mutex::new(Vec::new()),
            connect_calls: AtomicUsize::new(0),
            sign_and_submit_calls: AtomicUsize::new(0),
            sign_only_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_both() -> Self {
        Self::build(true, true)
    }

    pub fn sign_and_submit() -> Self {
        Self::build(true, false)
    }

    pub fn sign_only() -> Self {
        Self::build(false, true)
    }

    pub fn without_capabilities() -> Self {
        Self::build(false, false)
    }

    /// Sign-only wallet that reports no account until connected
    pub fn disconnected() -> Self {
        let wallet = Self::build(false, true);
        *lock(&wallet.connected) = false;
        wallet
    }

    pub fn reject_with(&self, message: impl Into<String>) {
        *lock(&self.rejection) = Some(message.into());
    }

    pub fn push_event(&self, event: WalletEvent) {
        lock(&self.events).push(event);
    }

    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Every transaction this wallet signed, in order
    pub fn signed(&self) -> Vec<Transaction> {
        lock(&self.signed).clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn sign_and_submit_calls(&self) -> usize {
        self.sign_and_submit_calls.load(Ordering::SeqCst)
    }

    pub fn sign_only_calls(&self) -> usize {
        self.sign_only_calls.load(Ordering::SeqCst)
    }

    pub fn signing_calls(&self) -> usize {
        self.sign_and_submit_calls() + self.sign_only_calls()
    }

    fn sign(&self, mut tx: Transaction) -> Result<Transaction, WalletError> {
        if let Some(message) = lock(&self.rejection).clone() {
            return Err(WalletError::Rejected(message));
        }
        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| WalletError::Failed(e.to_string()))?;
        lock(&self.signed).push(tx.clone());
        Ok(tx)
    }
}

#[async_trait]
impl SignAndSubmit for MockWallet {
    async fn sign_and_submit(&self, tx: Transaction) -> Result<Signature, WalletError> {
        self.sign_and_submit_calls.fetch_add(1, Ordering::SeqCst);
        let signed = self.sign(tx)?;
        signed
            .signatures
            .first()
            .copied()
            .ok_or_else(|| WalletError::Failed("transaction has no signatures".to_string()))
    }
}

#[async_trait]
impl SignOnly for MockWallet {
    async fn sign_transaction(&self, tx: Transaction) -> Result<Transaction, WalletError> {
        self.sign_only_calls.fetch_add(1, Ordering::SeqCst);
        self.sign(tx)
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn pubkey(&self) -> Option<Pubkey> {
        lock(&self.connected).then(|| self.keypair.pubkey())
    }

    async fn connect(&self) -> Result<Pubkey, WalletError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.connected) = true;
        Ok(self.keypair.pubkey())
    }

    fn capabilities(&self) -> WalletCapabilities<'_> {
        WalletCapabilities {
            sign_and_submit: self
                .offers_sign_and_submit
                .then_some(self as &dyn SignAndSubmit),
            sign_only: self.offers_sign_only.then_some(self as &dyn SignOnly),
        }
    }

    fn poll_events(&self) -> Vec<WalletEvent> {
        std::mem::take(&mut *lock(&self.events))
    }
}
