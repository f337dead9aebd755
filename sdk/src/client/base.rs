use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::RpcTransactionConfig,
    rpc_request::{RpcError, RpcRequest, RpcResponseErrorData},
};
use solana_sdk::{commitment_config::CommitmentConfig, transaction::TransactionError};
use solana_transaction_status::UiTransactionEncoding;
use solana_program::program_pack::Pack;
use tracing::debug;

use crate::{config::EscrowConfig, prelude::*, transaction::FreshnessToken};

/// Ledger reads and writes used by the escrow flows
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Raw token balance of an SPL token account
    async fn token_account_balance(&self, address: &Pubkey) -> SdkResult<u64>;

    async fn latest_freshness_token(&self) -> SdkResult<FreshnessToken>;

    /// Broadcast an already signed, wire-encoded transaction
    async fn submit_raw_transaction(&self, wire: &[u8]) -> SdkResult<Signature>;

    /// `None` while the ledger has not seen the signature at `commitment`
    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> SdkResult<Option<Result<(), TransactionError>>>;

    async fn block_height(&self, commitment: CommitmentConfig) -> SdkResult<u64>;

    async fn transaction_logs(&self, signature: &Signature) -> SdkResult<Vec<String>>;
}

/// [`Ledger`] backed by a JSON-RPC node
pub struct RpcLedger {
    rpc: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        let commitment = rpc.commitment();
        Self { rpc, commitment }
    }

    pub fn from_config(config: &EscrowConfig) -> SdkResult<Self> {
        let commitment = config.commitment_config()?;
        let rpc = RpcClient::new_with_commitment(config.rpc_url.clone(), commitment);
        Ok(Self {
            rpc: Arc::new(rpc),
            commitment,
        })
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn rpc_url(&self) -> String {
        self.rpc.url()
    }
}

/// Preflight rejections carry the simulated program logs
fn submission_error(err: ClientError) -> SdkError {
    let logs = match err.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
            ..
        }) => result.logs.clone().unwrap_or_default(),
        _ => Vec::new(),
    };
    SdkError::SubmissionFailed {
        reason: err.to_string(),
        logs,
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn token_account_balance(&self, address: &Pubkey) -> SdkResult<u64> {
        let account = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await?
            .value
            .ok_or_else(|| SdkError::TokenAccountUnavailable {
                account: *address,
                reason: "account does not exist".to_string(),
            })?;

        let state = spl_token::state::Account::unpack(&account.data).map_err(|e| {
            SdkError::TokenAccountUnavailable {
                account: *address,
                reason: e.to_string(),
            }
        })?;
        Ok(state.amount)
    }

    async fn latest_freshness_token(&self) -> SdkResult<FreshnessToken> {
        let (blockhash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(CommitmentConfig::processed())
            .await?;
        debug!(%blockhash, last_valid_block_height, "fetched blockhash");
        Ok(FreshnessToken {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn submit_raw_transaction(&self, wire: &[u8]) -> SdkResult<Signature> {
        let params = json!([
            STANDARD.encode(wire),
            {
                "encoding": "base64",
                "preflightCommitment": self.commitment.commitment,
            }
        ]);
        let signature: String = self
            .rpc
            .send(RpcRequest::SendTransaction, params)
            .await
            .map_err(submission_error)?;
        Signature::from_str(&signature).map_err(|e| {
            SdkError::SerializationError(format!("Node returned invalid signature {}: {}", signature, e))
        })
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> SdkResult<Option<Result<(), TransactionError>>> {
        Ok(self
            .rpc
            .get_signature_status_with_commitment(signature, commitment)
            .await?)
    }

    async fn block_height(&self, commitment: CommitmentConfig) -> SdkResult<u64> {
        Ok(self.rpc.get_block_height_with_commitment(commitment).await?)
    }

    async fn transaction_logs(&self, signature: &Signature) -> SdkResult<Vec<String>> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        let tx = self.rpc.get_transaction_with_config(signature, config).await?;
        Ok(tx
            .transaction
            .meta
            .and_then(|meta| Option::<Vec<String>>::from(meta.log_messages))
            .unwrap_or_default())
    }
}
