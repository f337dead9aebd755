use std::{fs, path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;

use crate::{
    core::{
        pubkey_serde, DEFAULT_CONFIRM_TIMEOUT_SECS, DEFAULT_MINT_DECIMALS, DEFAULT_POLL_INTERVAL_MS,
        MAX_MINT_DECIMALS,
    },
    prelude::*,
};

/// Prefix of the environment variables read by [`EscrowConfig::load`]
pub const ENV_PREFIX: &str = "OPENSTAY";

/// Connection and deployment settings for the escrow client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// RPC endpoint URL
    pub rpc_url: String,

    /// WebSocket URL; derived from `rpc_url` when absent
    pub ws_url: Option<String>,

    /// Escrow program ID
    #[serde(with = "pubkey_serde")]
    pub program_id: Pubkey,

    /// Stablecoin mint held in escrow
    #[serde(with = "pubkey_serde")]
    pub mint: Pubkey,

    pub mint_decimals: u8,

    /// Commitment level awaited after submission
    pub commitment: String,

    pub confirm_timeout_secs: u64,

    pub poll_interval_ms: u64,

    /// Transaction-preparation service for the server-assisted path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// Every key optional so missing ones can be named in the error
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(alias = "solana_rpc")]
    rpc_url: Option<String>,
    ws_url: Option<String>,
    program_id: Option<String>,
    #[serde(alias = "usdc_mint")]
    mint: Option<String>,
    #[serde(alias = "usdc_decimals")]
    mint_decimals: Option<u8>,
    commitment: Option<String>,
    confirm_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    #[serde(alias = "escrow_api")]
    api_url: Option<String>,
}

impl EscrowConfig {
    fn with_defaults(rpc_url: &str, program_id: Pubkey, mint: Pubkey) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            ws_url: Some(derive_ws_url(rpc_url)),
            program_id,
            mint,
            mint_decimals: DEFAULT_MINT_DECIMALS,
            commitment: "confirmed".to_string(),
            confirm_timeout_secs: DEFAULT_CONFIRM_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            api_url: None,
        }
    }

    pub fn localnet(program_id: Pubkey, mint: Pubkey) -> Self {
        Self::with_defaults("http://localhost:8899", program_id, mint)
    }

    pub fn devnet(program_id: Pubkey, mint: Pubkey) -> Self {
        Self::with_defaults("https://api.devnet.solana.com", program_id, mint)
    }

    /// Replace the RPC URL and re-derive the WebSocket URL
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self.ws_url = Some(derive_ws_url(&self.rpc_url));
        self
    }

    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.commitment = commitment.into();
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Load from an optional TOML file overlaid with `OPENSTAY_*` variables
    pub fn load(path: Option<&Path>) -> SdkResult<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> SdkResult<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(::config::Environment::with_prefix(env_prefix));

        let raw: RawConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SdkError::ConfigurationError(e.to_string()))?;
        Self::from_raw(raw, env_prefix)
    }

    fn from_raw(raw: RawConfig, env_prefix: &str) -> SdkResult<Self> {
        let missing = |key: &str| {
            SdkError::ConfigurationError(format!(
                "Missing {} (set {}_{})",
                key,
                env_prefix,
                key.to_uppercase()
            ))
        };
        let rpc_url = raw.rpc_url.ok_or_else(|| missing("rpc_url"))?;
        let program_id = parse_pubkey("program_id", &raw.program_id.ok_or_else(|| missing("program_id"))?)?;
        let mint = parse_pubkey("mint", &raw.mint.ok_or_else(|| missing("usdc_mint"))?)?;

        let ws_url = raw.ws_url.or_else(|| Some(derive_ws_url(&rpc_url)));
        let config = Self {
            rpc_url,
            ws_url,
            program_id,
            mint,
            mint_decimals: raw.mint_decimals.unwrap_or(DEFAULT_MINT_DECIMALS),
            commitment: raw.commitment.unwrap_or_else(|| "confirmed".to_string()),
            confirm_timeout_secs: raw
                .confirm_timeout_secs
                .unwrap_or(DEFAULT_CONFIRM_TIMEOUT_SECS),
            poll_interval_ms: raw.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            api_url: raw.api_url,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SdkResult<()> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(SdkError::ConfigurationError(format!(
                "rpc_url must be an http(s) URL, got {}",
                self.rpc_url
            )));
        }
        if self.mint_decimals > MAX_MINT_DECIMALS {
            return Err(SdkError::ConfigurationError(format!(
                "mint_decimals {} exceeds {}",
                self.mint_decimals, MAX_MINT_DECIMALS
            )));
        }
        if self.confirm_timeout_secs == 0 {
            return Err(SdkError::ConfigurationError(
                "confirm_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(SdkError::ConfigurationError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        self.commitment_config()?;
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> SdkResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SdkError::SerializationError(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content).map_err(|e| {
            SdkError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn commitment_config(&self) -> SdkResult<CommitmentConfig> {
        CommitmentConfig::from_str(&self.commitment).map_err(|_| {
            SdkError::ConfigurationError(format!("Unknown commitment level: {}", self.commitment))
        })
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ws_url(&self) -> String {
        self.ws_url
            .clone()
            .unwrap_or_else(|| derive_ws_url(&self.rpc_url))
    }
}

fn parse_pubkey(key: &str, value: &str) -> SdkResult<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|_| {
        SdkError::ConfigurationError(format!("{} is not a valid address: {}", key, value))
    })
}

/// `https://` becomes `wss://`, `http://` becomes `ws://`
pub fn derive_ws_url(rpc_url: &str) -> String {
    if let Some(rest) = rpc_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = rpc_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        rpc_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PROGRAM: &str = "Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS";
    const MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("openstay-{}-{}.toml", name, std::process::id()))
    }

    #[test]
    fn test_ws_url_derivation() {
        assert_eq!(derive_ws_url("https://api.devnet.solana.com"), "wss://api.devnet.solana.com");
        assert_eq!(derive_ws_url("http://localhost:8899"), "ws://localhost:8899");
        assert_eq!(derive_ws_url("ws://already"), "ws://already");
    }

    #[test]
    fn test_presets() {
        let program = Pubkey::from_str(PROGRAM).unwrap();
        let mint = Pubkey::from_str(MINT).unwrap();
        let config = EscrowConfig::devnet(program, mint);
        assert_eq!(config.ws_url(), "wss://api.devnet.solana.com");
        assert_eq!(config.mint_decimals, 6);
        assert_eq!(config.commitment_config().unwrap(), CommitmentConfig::confirmed());
        config.validate().unwrap();

        let config = EscrowConfig::localnet(program, mint)
            .with_rpc_url("https://rpc.example.com")
            .with_commitment("finalized");
        assert_eq!(config.ws_url.as_deref(), Some("wss://rpc.example.com"));
        assert_eq!(config.commitment_config().unwrap(), CommitmentConfig::finalized());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = EscrowConfig::localnet(Pubkey::new_unique(), Pubkey::new_unique());

        let mut config = base.clone();
        config.confirm_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.mint_decimals = 19;
        assert!(config.validate().is_err());

        let config = base.clone().with_commitment("eventually");
        assert!(config.validate().is_err());

        let mut config = base;
        config.rpc_url = "localhost:8899".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = temp_path("load");
        fs::write(
            &path,
            format!(
                "rpc_url = \"https://api.devnet.solana.com\"\nprogram_id = \"{}\"\nusdc_mint = \"{}\"\nusdc_decimals = 9\n",
                PROGRAM, MINT
            ),
        )
        .unwrap();

        let config = EscrowConfig::load_with_prefix(Some(&path), "OPENSTAY_TEST_LOAD").unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.program_id.to_string(), PROGRAM);
        assert_eq!(config.mint.to_string(), MINT);
        assert_eq!(config.mint_decimals, 9);
        assert_eq!(config.ws_url.as_deref(), Some("wss://api.devnet.solana.com"));
        assert_eq!(config.confirm_timeout_secs, 60);
        assert_eq!(config.poll_interval_ms, 500);
        assert!(config.api_url.is_none());
    }

    #[test]
    fn test_load_names_missing_key() {
        let path = temp_path("missing");
        fs::write(&path, format!("rpc_url = \"http://localhost:8899\"\nusdc_mint = \"{}\"\n", MINT)).unwrap();

        let err = EscrowConfig::load_with_prefix(Some(&path), "OPENSTAY_TEST_MISSING").unwrap_err();
        fs::remove_file(&path).ok();

        assert!(matches!(err, SdkError::ConfigurationError(_)));
        assert!(err.to_string().contains("program_id"));
    }

    #[test]
    fn test_load_rejects_malformed_address() {
        let path = temp_path("malformed");
        fs::write(
            &path,
            format!(
                "rpc_url = \"http://localhost:8899\"\nprogram_id = \"not-a-key\"\nmint = \"{}\"\n",
                MINT
            ),
        )
        .unwrap();

        let err = EscrowConfig::load_with_prefix(Some(&path), "OPENSTAY_TEST_MALFORMED").unwrap_err();
        fs::remove_file(&path).ok();

        assert!(err.to_string().contains("program_id is not a valid address"));
    }

    #[test]
    fn test_save_round_trip() {
        let config = EscrowConfig::devnet(Pubkey::new_unique(), Pubkey::new_unique())
            .with_api_url("https://api.openstay.example");
        let path = temp_path("save");
        config.save(&path).unwrap();

        let loaded = EscrowConfig::load_with_prefix(Some(&path), "OPENSTAY_TEST_SAVE").unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
