// Command modules for the openstay CLI

pub mod derive;
pub mod encode;
pub mod hold;
pub mod release;
pub mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use openstay_sdk::EscrowConfig;

/// Global options shared by every subcommand
pub struct CliContext {
    pub config_path: Option<PathBuf>,
    pub rpc_url: Option<String>,
    pub wallet_path: String,
}

impl CliContext {
    pub fn load_config(&self) -> Result<EscrowConfig> {
        let config = EscrowConfig::load(self.config_path.as_deref())
            .context("Failed to load configuration")?;
        Ok(match &self.rpc_url {
            Some(url) => config.with_rpc_url(url.clone()),
            None => config,
        })
    }
}
