//! RPC-compatible types for the mock chain.
//!
//! These types are JSON-serializable versions of the core auction types,
//! with byte fields hex-encoded.

use auction_module::AuctionEvent;
use auction_types::Address;
use serde::{Deserialize, Serialize};

/// Genesis configuration for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfigRpc {
    /// Hex-encoded oracle identity (32 bytes); a fixed default is used
    /// when absent.
    pub oracle_authority: Option<String>,
    pub initial_item: Option<String>,
    pub initial_timestamp: Option<u64>,
}

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Parameters for seeding an account balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundParams {
    pub address: String,
    pub amount: u64,
}

/// Parameters for starting a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAuctionParams {
    pub sender: String,
    pub duration: u64,
}

/// Parameters for setting the item description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetItemParams {
    pub sender: String,
    pub item: String,
}

/// Parameters for submitting a sealed bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidParams {
    pub sender: String,
    /// Hex-encoded sealed ciphertext
    pub ciphertext: String,
    /// Hex-encoded input binding proof
    pub input_proof: String,
    /// Plaintext deposit attached to the call
    pub deposit: u64,
}

/// Parameters carrying only a sender identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderParams {
    pub sender: String,
}

/// Snapshot of the plaintext ledger fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionInfoRpc {
    pub admin: Option<String>,
    pub item: String,
    pub start_time: u64,
    pub end_time: u64,
    pub auction_started: bool,
    pub auction_ended: bool,
    pub pool: u64,
}

/// Revealed winner info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerInfoRpc {
    pub winner: String,
    pub amount: u64,
}

/// A delivered oracle callback, as reported to the pump caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackRpc {
    pub request_id: u64,
    /// Which reveal the callback completed: "bidder", "amount", "total"
    pub kind: String,
}

/// Observable auction notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventRpc {
    AuctionStarted {
        admin: String,
        start_time: u64,
        end_time: u64,
    },
    WinnerAnnounced {
        winner: String,
        amount: u64,
    },
    ProceedsWithdrawn {
        admin: String,
        amount: u64,
    },
}

impl From<AuctionEvent> for EventRpc {
    fn from(event: AuctionEvent) -> Self {
        match event {
            AuctionEvent::AuctionStarted {
                admin,
                start_time,
                end_time,
            } => EventRpc::AuctionStarted {
                admin: hex::encode(admin),
                start_time,
                end_time,
            },
            AuctionEvent::WinnerAnnounced { winner, amount } => EventRpc::WinnerAnnounced {
                winner: hex::encode(winner),
                amount,
            },
            AuctionEvent::ProceedsWithdrawn { admin, amount } => EventRpc::ProceedsWithdrawn {
                admin: hex::encode(admin),
                amount,
            },
        }
    }
}

/// Parse a hex-encoded 32-byte identity.
pub fn parse_address(s: &str) -> Result<Address, String> {
    let bytes = hex::decode(s).map_err(|e| format!("invalid hex address: {e}"))?;
    bytes
        .try_into()
        .map_err(|_| "address must be 32 bytes".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_roundtrip() {
        let addr = [7u8; 32];
        assert_eq!(parse_address(&hex::encode(addr)), Ok(addr));
    }

    #[test]
    fn test_parse_address_rejects_bad_input() {
        assert!(parse_address("zz").is_err());
        assert!(parse_address("0011").is_err());
    }
}
