// Utility functions for CLI commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use openstay_sdk::{local_datetime_to_unix_seconds, unix_seconds_to_local_datetime, KeypairWallet};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Expand a leading ~ to $HOME
pub fn expand_home(path: &str) -> Result<PathBuf> {
    if let Some(rest) = path.strip_prefix('~') {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(format!("{}{}", home, rest)))
    } else {
        Ok(PathBuf::from(path))
    }
}

/// Load a keypair wallet from a file path, expanding ~ if needed
pub fn load_wallet(path: &str) -> Result<KeypairWallet> {
    let path = expand_home(path)?;
    KeypairWallet::from_file(&path).map_err(|e| anyhow::anyhow!("{}", e))
}

/// Parse a pubkey from string
pub fn parse_pubkey(label: &str, s: &str) -> Result<Pubkey> {
    Pubkey::from_str(s.trim()).with_context(|| format!("Invalid {} address: {}", label, s))
}

/// Unix seconds, or a local `YYYY-MM-DDTHH:MM` date-time
pub fn parse_release_time(s: &str) -> Result<i64> {
    let trimmed = s.trim();
    if let Ok(secs) = trimmed.parse::<i64>() {
        return Ok(secs);
    }
    local_datetime_to_unix_seconds(trimmed).map_err(|e| anyhow::anyhow!("{}", e))
}

/// Human-readable form of a release timestamp
pub fn describe_release_time(secs: i64) -> String {
    match unix_seconds_to_local_datetime(secs) {
        Ok(local) => format!("{} ({})", local, secs),
        Err(_) => secs.to_string(),
    }
}

/// Print success message
pub fn success(msg: &str) {
    println!("[OK] {}", msg);
}

/// Print info message
pub fn info(msg: &str) {
    println!("[INFO] {}", msg);
}

/// Print warning message
pub fn warn(msg: &str) {
    eprintln!("[WARN] {}", msg);
}

/// Print error message, with program logs when the failure carries any
pub fn error_with_logs(err: &openstay_sdk::SdkError) {
    eprintln!("[ERROR] {}", err);
    for line in err.logs() {
        eprintln!("    {}", line);
    }
}
