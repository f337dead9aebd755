use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Everything that identifies one escrow instance on chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowKey {
    #[serde(with = "pubkey_serde")]
    pub initializer: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub beneficiary: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub mint: Pubkey,
    /// Unix seconds after which the beneficiary may be paid
    pub release_ts: i64,
}

impl EscrowKey {
    pub fn new(initializer: Pubkey, beneficiary: Pubkey, mint: Pubkey, release_ts: i64) -> Self {
        Self {
            initializer,
            beneficiary,
            mint,
            release_ts,
        }
    }
}

/// Request to lock funds in a new escrow
#[derive(Clone, Debug)]
pub struct HoldRequest {
    pub initializer: Pubkey,
    pub beneficiary: Pubkey,
    /// Amount in base units of the configured mint
    pub amount: u64,
    pub release_ts: i64,
}

/// Request to pay out an existing escrow to its beneficiary
#[derive(Clone, Debug)]
pub struct ReleaseRequest {
    pub initializer: Pubkey,
    pub beneficiary: Pubkey,
    pub release_ts: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Held,
    Releasable,
    Released,
}

/// Booking as persisted by the host application.
///
/// The SDK never stores these. Callers save one after a confirmed hold and
/// set `released` after a confirmed release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub listing_id: String,
    pub escrow: EscrowKey,
    /// Total as entered by the guest, e.g. "240.00"
    pub total_ui: String,
    #[serde(default)]
    pub released: bool,
}

impl BookingRecord {
    /// Host-side identifier, stable per listing and release time
    pub fn id(&self) -> String {
        format!("{}-{}", self.listing_id, self.escrow.release_ts)
    }

    pub fn status_at(&self, now_unix: i64) -> BookingStatus {
        if self.released {
            BookingStatus::Released
        } else if now_unix >= self.escrow.release_ts {
            BookingStatus::Releasable
        } else {
            BookingStatus::Held
        }
    }

    pub fn mark_released(&mut self) {
        self.released = true;
    }
}

/// Serde adapter rendering a Pubkey as base-58 text
pub mod pubkey_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S>(pubkey: &Pubkey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&pubkey.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Pubkey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(release_ts: i64) -> BookingRecord {
        BookingRecord {
            listing_id: "lisbon-loft".to_string(),
            escrow: EscrowKey::new(
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                release_ts,
            ),
            total_ui: "240.00".to_string(),
            released: false,
        }
    }

    #[test]
    fn test_status_is_derived_from_clock() {
        let mut rec = record(1_800_000_000);
        assert_eq!(rec.status_at(1_799_999_999), BookingStatus::Held);
        assert_eq!(rec.status_at(1_800_000_000), BookingStatus::Releasable);

        rec.mark_released();
        assert_eq!(rec.status_at(1_900_000_000), BookingStatus::Released);
        assert_eq!(rec.status_at(0), BookingStatus::Released);
    }

    #[test]
    fn test_record_json_shape() {
        let rec = record(1_800_000_000);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["listingId"], "lisbon-loft");
        assert_eq!(json["escrow"]["releaseTs"], 1_800_000_000i64);
        assert_eq!(
            json["escrow"]["initializer"],
            rec.escrow.initializer.to_string()
        );

        let back: BookingRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
        assert_eq!(back.id(), "lisbon-loft-1800000000");
    }
}
