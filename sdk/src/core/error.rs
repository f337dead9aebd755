use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{label} is not a valid address: {value}")]
    InvalidAddress { label: String, value: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid date/time: {0}")]
    InvalidDateTime(String),

    #[error("Insufficient funds in {account}: have {available}, need {required}")]
    InsufficientFunds {
        account: Pubkey,
        available: u64,
        required: u64,
    },

    #[error("Token account {account} missing or unreadable: {reason}")]
    TokenAccountUnavailable { account: Pubkey, reason: String },

    #[error("No valid bump found for {seed} address under program {program_id}")]
    DerivationExhausted { seed: String, program_id: Pubkey },

    #[error("Wallet cannot sign transactions")]
    SignerUnavailable,

    #[error("Signing request rejected: {0}")]
    SignerRejected(String),

    #[error("Submission failed: {reason}")]
    SubmissionFailed { reason: String, logs: Vec<String> },

    #[error("Transaction {signature} not confirmed in time ({} log lines)", logs.len())]
    ConfirmationTimeout {
        signature: Signature,
        logs: Vec<String>,
    },

    #[error("Transaction {signature} failed: {reason}")]
    ConfirmationFailed {
        signature: Signature,
        reason: String,
        logs: Vec<String>,
    },

    #[error(
        "Blockhash expired before {signature} was confirmed (last valid block height {last_valid_block_height})"
    )]
    StaleFreshnessToken {
        signature: Signature,
        last_valid_block_height: u64,
        logs: Vec<String>,
    },

    #[error("Transaction has no recent blockhash attached")]
    MissingFreshnessToken,

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SdkError {
    pub fn invalid_address(label: &str, value: impl Into<String>) -> Self {
        SdkError::InvalidAddress {
            label: label.to_string(),
            value: value.into(),
        }
    }

    /// The user can fix these and try again (approve, top up, create the account)
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            SdkError::SignerRejected(_)
                | SdkError::InsufficientFunds { .. }
                | SdkError::TokenAccountUnavailable { .. }
        )
    }

    /// The feature cannot work with the current deployment settings
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SdkError::ConfigurationError(_) | SdkError::DerivationExhausted { .. }
        )
    }

    /// Execution log lines attached to a post-submission failure
    pub fn logs(&self) -> &[String] {
        match self {
            SdkError::SubmissionFailed { logs, .. }
            | SdkError::ConfirmationTimeout { logs, .. }
            | SdkError::ConfirmationFailed { logs, .. }
            | SdkError::StaleFreshnessToken { logs, .. } => logs,
            _ => &[],
        }
    }
}

impl From<solana_client::client_error::ClientError> for SdkError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        SdkError::RpcError(err.to_string())
    }
}

impl From<std::io::Error> for SdkError {
    fn from(err: std::io::Error) -> Self {
        SdkError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for SdkError {
    fn from(err: bincode::Error) -> Self {
        SdkError::SerializationError(err.to_string())
    }
}

impl From<base64::DecodeError> for SdkError {
    fn from(err: base64::DecodeError) -> Self {
        SdkError::SerializationError(err.to_string())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
