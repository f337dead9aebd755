use solana_sdk::transaction::Transaction;
use tracing::{debug, info};

use crate::{client::Ledger, prelude::*, wallet::SigningCapability};

/// Sign and broadcast `tx` through the chosen capability.
///
/// Exactly one submission attempt is made.
pub async fn dispatch(
    ledger: &dyn Ledger,
    capability: SigningCapability<'_>,
    tx: Transaction,
) -> SdkResult<Signature> {
    debug!(capability = capability.name(), "requesting signature");
    let signature = match capability {
        SigningCapability::SignAndSubmit(wallet) => wallet.sign_and_submit(tx).await?,
        SigningCapability::SignOnly(wallet) => {
            let signed = wallet.sign_transaction(tx).await?;
            let wire = bincode::serialize(&signed)?;
            ledger.submit_raw_transaction(&wire).await?
        }
    };
    info!(%signature, capability = capability.name(), "transaction submitted");
    Ok(signature)
}
