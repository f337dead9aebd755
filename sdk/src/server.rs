//! Server-assisted path: a preparation service builds the transaction, the
//! wallet only signs it.

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use solana_sdk::transaction::Transaction;
use tracing::{debug, info};

use crate::{
    client::{dispatch, ConfirmationMonitor, Ledger},
    core::{pubkey_serde, HoldRequest, ReleaseRequest},
    prelude::*,
    transaction::FreshnessToken,
    wallet::{SigningCapability, WalletProvider},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedHoldRequest {
    #[serde(with = "pubkey_serde")]
    pub initializer: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub beneficiary: Pubkey,
    /// Base units as a decimal string
    pub amount: String,
    pub release_ts: i64,
}

impl From<&HoldRequest> for PreparedHoldRequest {
    fn from(request: &HoldRequest) -> Self {
        Self {
            initializer: request.initializer,
            beneficiary: request.beneficiary,
            amount: request.amount.to_string(),
            release_ts: request.release_ts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedReleaseRequest {
    #[serde(with = "pubkey_serde")]
    pub initializer: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub beneficiary: Pubkey,
    pub release_ts: i64,
}

impl From<&ReleaseRequest> for PreparedReleaseRequest {
    fn from(request: &ReleaseRequest) -> Self {
        Self {
            initializer: request.initializer,
            beneficiary: request.beneficiary,
            release_ts: request.release_ts,
        }
    }
}

/// Unsigned transaction returned by the preparation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTransaction {
    /// Base64 wire encoding
    pub tx: String,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ReleaseResponse {
    signature: String,
}

/// Decode the service's transaction and the freshness it was built with
pub fn decode_prepared_transaction(
    prepared: &PreparedTransaction,
) -> SdkResult<(Transaction, FreshnessToken)> {
    let wire = STANDARD.decode(prepared.tx.trim())?;
    let tx: Transaction = bincode::deserialize(&wire)?;
    let freshness = FreshnessToken {
        blockhash: tx.message.recent_blockhash,
        last_valid_block_height: prepared.last_valid_block_height,
    };
    Ok((tx, freshness))
}

/// HTTP client for the preparation service
pub struct PreparedTxApi {
    http: reqwest::Client,
    base_url: String,
}

impl PreparedTxApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn prepare_hold(&self, request: &PreparedHoldRequest) -> SdkResult<PreparedTransaction> {
        self.post("hold", request).await
    }

    /// The service signs and submits releases itself
    pub async fn release(&self, request: &PreparedReleaseRequest) -> SdkResult<Signature> {
        let response: ReleaseResponse = self.post("release", request).await?;
        Signature::from_str(&response.signature).map_err(|e| {
            SdkError::SerializationError(format!(
                "Service returned invalid signature {}: {}",
                response.signature, e
            ))
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> SdkResult<T>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "posting to preparation service");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SdkError::RpcError(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SdkError::RpcError(format!("{} returned {}: {}", url, status, text)));
        }
        response
            .json()
            .await
            .map_err(|e| SdkError::SerializationError(format!("{}: {}", url, e)))
    }
}

/// Sign a service-prepared transaction and wait for confirmation
pub async fn submit_prepared(
    ledger: &dyn Ledger,
    wallet: &dyn WalletProvider,
    monitor: &ConfirmationMonitor,
    prepared: &PreparedTransaction,
) -> SdkResult<Signature> {
    let capabilities = wallet.capabilities();
    let capability = SigningCapability::resolve(&capabilities)?;
    let (tx, freshness) = decode_prepared_transaction(prepared)?;
    let signature = dispatch(ledger, capability, tx).await?;
    monitor.await_finality(ledger, &signature, &freshness).await?;
    info!(%signature, "prepared transaction confirmed");
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLedger, MockWallet, ScriptedStatus};
    use solana_sdk::{hash::Hash, system_instruction};
    use std::time::Duration;

    #[test]
    fn test_request_bodies_are_camel_case() {
        let request = PreparedHoldRequest {
            initializer: Pubkey::new_unique(),
            beneficiary: Pubkey::new_unique(),
            amount: "120000000".into(),
            release_ts: 1_751_364_000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["releaseTs"], 1_751_364_000);
        assert_eq!(json["amount"], "120000000");
        assert_eq!(json["initializer"], request.initializer.to_string());

        let prepared: PreparedTransaction =
            serde_json::from_str(r#"{"tx":"AA==","lastValidBlockHeight":42}"#).unwrap();
        assert_eq!(prepared.last_valid_block_height, 42);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let prepared = PreparedTransaction {
            tx: "not base64!".into(),
            last_valid_block_height: 1,
        };
        assert!(matches!(
            decode_prepared_transaction(&prepared),
            Err(SdkError::SerializationError(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_prepared_signs_and_confirms() {
        let ledger = MockLedger::new();
        ledger.script_statuses(vec![ScriptedStatus::Confirmed]);
        let wallet = MockWallet::sign_only();

        let payer = wallet.address();
        let blockhash = Hash::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);
        let mut tx = Transaction::new_with_payer(&[ix], Some(&payer));
        tx.message.recent_blockhash = blockhash;
        let prepared = PreparedTransaction {
            tx: STANDARD.encode(bincode::serialize(&tx).unwrap()),
            last_valid_block_height: 300,
        };

        let (decoded, freshness) = decode_prepared_transaction(&prepared).unwrap();
        assert_eq!(decoded.message, tx.message);
        assert_eq!(freshness.blockhash, blockhash);

        let monitor = ConfirmationMonitor::new(
            solana_sdk::commitment_config::CommitmentConfig::confirmed(),
            Duration::from_secs(1),
            Duration::from_millis(5),
        );
        let signature = submit_prepared(&ledger, &wallet, &monitor, &prepared)
            .await
            .unwrap();
        assert_eq!(ledger.submitted().len(), 1);
        assert_eq!(ledger.submitted()[0].signatures[0], signature);
    }
}
