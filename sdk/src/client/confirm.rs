use std::time::Duration;

use solana_sdk::commitment_config::CommitmentConfig;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::{
    client::Ledger,
    config::EscrowConfig,
    core::{DEFAULT_CONFIRM_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS},
    prelude::*,
    transaction::FreshnessToken,
};

/// Polls signature status until confirmed, failed, expired or timed out
#[derive(Clone, Debug)]
pub struct ConfirmationMonitor {
    pub commitment: CommitmentConfig,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationMonitor {
    fn default() -> Self {
        Self {
            commitment: CommitmentConfig::confirmed(),
            timeout: Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ConfirmationMonitor {
    pub fn new(commitment: CommitmentConfig, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            commitment,
            timeout,
            poll_interval,
        }
    }

    pub fn from_config(config: &EscrowConfig) -> SdkResult<Self> {
        Ok(Self::new(
            config.commitment_config()?,
            config.confirm_timeout(),
            config.poll_interval(),
        ))
    }

    /// Wait for `signature` to reach the configured commitment.
    ///
    /// Every failure carries whatever program logs could be fetched.
    pub async fn await_finality(
        &self,
        ledger: &dyn Ledger,
        signature: &Signature,
        freshness: &FreshnessToken,
    ) -> SdkResult<()> {
        let started = Instant::now();
        loop {
            if self.poll_status(ledger, signature).await? {
                info!(%signature, elapsed_ms = started.elapsed().as_millis() as u64, "transaction confirmed");
                return Ok(());
            }

            let height = match ledger.block_height(self.commitment).await {
                Ok(height) => height,
                Err(e) => return Err(self.failed(ledger, signature, e.to_string()).await),
            };
            if height > freshness.last_valid_block_height {
                // Landed between the status read and the height read
                if self.poll_status(ledger, signature).await? {
                    return Ok(());
                }
                warn!(%signature, height, last_valid = freshness.last_valid_block_height, "blockhash expired");
                return Err(SdkError::StaleFreshnessToken {
                    signature: *signature,
                    last_valid_block_height: freshness.last_valid_block_height,
                    logs: fetch_logs(ledger, signature).await,
                });
            }

            if started.elapsed() >= self.timeout {
                warn!(%signature, timeout_secs = self.timeout.as_secs(), "confirmation timed out");
                return Err(SdkError::ConfirmationTimeout {
                    signature: *signature,
                    logs: fetch_logs(ledger, signature).await,
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn poll_status(&self, ledger: &dyn Ledger, signature: &Signature) -> SdkResult<bool> {
        match ledger.signature_status(signature, self.commitment).await {
            Ok(Some(Ok(()))) => Ok(true),
            Ok(Some(Err(err))) => Err(self.failed(ledger, signature, err.to_string()).await),
            Ok(None) => Ok(false),
            Err(e) => Err(self.failed(ledger, signature, e.to_string()).await),
        }
    }

    async fn failed(&self, ledger: &dyn Ledger, signature: &Signature, reason: String) -> SdkError {
        warn!(%signature, %reason, "transaction failed");
        SdkError::ConfirmationFailed {
            signature: *signature,
            reason,
            logs: fetch_logs(ledger, signature).await,
        }
    }
}

/// Best effort; an unavailable log fetch yields no lines
async fn fetch_logs(ledger: &dyn Ledger, signature: &Signature) -> Vec<String> {
    match ledger.transaction_logs(signature).await {
        Ok(logs) => logs,
        Err(e) => {
            debug!(%signature, error = %e, "log fetch failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLedger, ScriptedStatus};
    use solana_sdk::{hash::Hash, instruction::InstructionError, transaction::TransactionError};

    fn fast_monitor(timeout_ms: u64) -> ConfirmationMonitor {
        ConfirmationMonitor::new(
            CommitmentConfig::confirmed(),
            Duration::from_millis(timeout_ms),
            Duration::from_millis(5),
        )
    }

    fn token(last_valid_block_height: u64) -> FreshnessToken {
        FreshnessToken {
            blockhash: Hash::new_unique(),
            last_valid_block_height,
        }
    }

    #[tokio::test]
    async fn test_confirms_after_pending_polls() {
        let ledger = MockLedger::new();
        ledger.script_statuses(vec![
            ScriptedStatus::Pending,
            ScriptedStatus::Pending,
            ScriptedStatus::Confirmed,
        ]);
        let sig = Signature::new_unique();

        fast_monitor(1_000)
            .await_finality(&ledger, &sig, &token(u64::MAX))
            .await
            .unwrap();
        assert_eq!(ledger.status_polls(), 3);
        assert_eq!(ledger.log_fetches(), 0);
    }

    #[tokio::test]
    async fn test_execution_error_carries_logs() {
        let ledger = MockLedger::new();
        ledger.set_logs(vec!["Program log: AnchorError".into()]);
        ledger.script_statuses(vec![ScriptedStatus::Failed(
            TransactionError::InstructionError(1, InstructionError::Custom(6000)),
        )]);
        let sig = Signature::new_unique();

        let err = fast_monitor(1_000)
            .await_finality(&ledger, &sig, &token(u64::MAX))
            .await
            .unwrap_err();
        match err {
            SdkError::ConfirmationFailed { signature, logs, .. } => {
                assert_eq!(signature, sig);
                assert_eq!(logs, vec!["Program log: AnchorError".to_string()]);
            }
            other => panic!("expected ConfirmationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_carries_logs() {
        let ledger = MockLedger::new();
        ledger.set_logs(vec!["Program log: still running".into()]);
        let sig = Signature::new_unique();

        let err = fast_monitor(30)
            .await_finality(&ledger, &sig, &token(u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::ConfirmationTimeout { signature, .. } if signature == sig));
        assert_eq!(err.logs(), ["Program log: still running".to_string()]);
    }

    #[tokio::test]
    async fn test_timeout_with_unavailable_logs() {
        let ledger = MockLedger::new();
        ledger.fail_log_fetch();
        let sig = Signature::new_unique();

        let err = fast_monitor(20)
            .await_finality(&ledger, &sig, &token(u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::ConfirmationTimeout { .. }));
        assert!(err.logs().is_empty());
        assert_eq!(ledger.log_fetches(), 1);
    }

    #[tokio::test]
    async fn test_expired_blockhash() {
        let ledger = MockLedger::new();
        ledger.set_block_height(501);
        let sig = Signature::new_unique();

        let err = fast_monitor(10_000)
            .await_finality(&ledger, &sig, &token(500))
            .await
            .unwrap_err();
        match err {
            SdkError::StaleFreshnessToken {
                last_valid_block_height,
                ..
            } => assert_eq!(last_valid_block_height, 500),
            other => panic!("expected StaleFreshnessToken, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_rpc_error_is_failure() {
        let ledger = MockLedger::new();
        ledger.script_statuses(vec![ScriptedStatus::RpcError("node unhealthy".into())]);
        let sig = Signature::new_unique();

        let err = fast_monitor(1_000)
            .await_finality(&ledger, &sig, &token(u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::ConfirmationFailed { ref reason, .. } if reason.contains("node unhealthy")));
    }
}
