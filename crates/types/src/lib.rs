//! Core type definitions for the confidential sealed-bid auction.
//!
//! This crate provides the shared data structures used across the auction
//! system: identities, ciphertext handles, decryption request ids, the
//! lifecycle phase, and the proof-carrying callback payloads delivered by
//! the decryption oracle.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

// =========================
// IDENTITIES
// =========================

/// Generic identity type (32 bytes)
pub type Address = [u8; 32];

/// The all-zero identity, used for "unset" winner/admin slots.
pub const ZERO_ADDRESS: Address = [0u8; 32];

// =========================
// CIPHERTEXT HANDLES
// =========================

/// Opaque handle to a ciphertext held by the encryption backend.
///
/// The auction core only ever moves these around; the plaintext behind a
/// handle is visible to nothing but the decryption oracle.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct CtHandle(pub [u8; 32]);

impl fmt::Debug for CtHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CtHandle({})", hex::encode(&self.0[..8]))
    }
}

/// Cleartext value revealed by the decryption oracle.
///
/// Each variant mirrors one of the encrypted scalar kinds the backend
/// supports (64-bit amounts, identities, booleans).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum Plaintext {
    Uint64(u64),
    Addr(Address),
    Bool(bool),
}

impl Plaintext {
    /// Short tag naming the scalar kind, used in error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Plaintext::Uint64(_) => "uint64",
            Plaintext::Addr(_) => "address",
            Plaintext::Bool(_) => "bool",
        }
    }

    pub fn as_uint64(&self) -> Option<u64> {
        match self {
            Plaintext::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Plaintext::Addr(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Plaintext::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

// =========================
// DECRYPTION REQUESTS
// =========================

/// Identifier correlating an oracle callback to the request that armed it.
///
/// Ids are assigned by the oracle starting from 1; zero never identifies a
/// live request.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Seam through which the auction core issues asynchronous decryption
/// requests without knowing anything about the oracle behind it.
pub trait DecryptionGateway {
    /// Submit a batch of ciphertext handles for reveal. Returns the id the
    /// eventual callback must carry.
    fn request_decryption(&mut self, handles: Vec<CtHandle>) -> RequestId;
}

/// Payload delivered by the oracle to a callback entry point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleCallback {
    pub request_id: RequestId,
    pub values: Vec<Plaintext>,
    /// Digest binding the values to the request id; see [`callback_digest`].
    pub proof: [u8; 32],
}

/// Compute the proof digest the oracle attaches to a callback.
///
/// Callback handlers recompute this over the delivered cleartexts and the
/// request id they have armed; any mismatch rejects the delivery.
pub fn callback_digest(request_id: RequestId, values: &[Plaintext]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"ORACLE_CALLBACK_V1:");
    hasher.update(request_id.0.to_le_bytes());
    for value in values {
        match value {
            Plaintext::Uint64(v) => {
                hasher.update([0u8]);
                hasher.update(v.to_le_bytes());
            }
            Plaintext::Addr(a) => {
                hasher.update([1u8]);
                hasher.update(a);
            }
            Plaintext::Bool(b) => {
                hasher.update([2u8]);
                hasher.update([*b as u8]);
            }
        }
    }
    hasher.finalize().into()
}

// =========================
// AUCTION LIFECYCLE
// =========================

/// Auction lifecycle phase.
///
/// Transitions only ever run Idle -> Started -> Ended and back to Idle via
/// an explicit reset.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub enum AuctionPhase {
    #[default]
    Idle,
    Started,
    Ended,
}

impl AuctionPhase {
    /// Whether a session has been started (and possibly ended).
    pub fn auction_started(&self) -> bool {
        matches!(self, AuctionPhase::Started | AuctionPhase::Ended)
    }

    /// Whether the current session's bidding has closed.
    pub fn auction_ended(&self) -> bool {
        matches!(self, AuctionPhase::Ended)
    }
}

/// Revealed winner identity and winning amount for a session.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct WinnerInfo {
    pub winner: Address,
    pub amount: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_digest_binds_request_id() {
        let values = [Plaintext::Uint64(300)];
        let d1 = callback_digest(RequestId(1), &values);
        let d2 = callback_digest(RequestId(2), &values);
        assert_ne!(d1, d2);
    }

    #[test]
    fn test_callback_digest_binds_values() {
        let id = RequestId(7);
        let d1 = callback_digest(id, &[Plaintext::Uint64(300)]);
        let d2 = callback_digest(id, &[Plaintext::Uint64(301)]);
        let d3 = callback_digest(id, &[Plaintext::Addr([3u8; 32])]);
        assert_ne!(d1, d2);
        assert_ne!(d1, d3);
    }

    #[test]
    fn test_phase_flags() {
        assert!(!AuctionPhase::Idle.auction_started());
        assert!(AuctionPhase::Started.auction_started());
        assert!(!AuctionPhase::Started.auction_ended());
        assert!(AuctionPhase::Ended.auction_started());
        assert!(AuctionPhase::Ended.auction_ended());
    }

    #[test]
    fn test_handle_serialization() {
        let handle = CtHandle([42u8; 32]);
        let encoded = borsh::to_vec(&handle).unwrap();
        let decoded: CtHandle = borsh::from_slice(&encoded).unwrap();
        assert_eq!(handle, decoded);
    }

    #[test]
    fn test_plaintext_accessors() {
        assert_eq!(Plaintext::Uint64(5).as_uint64(), Some(5));
        assert_eq!(Plaintext::Uint64(5).as_address(), None);
        assert_eq!(Plaintext::Addr([1u8; 32]).as_address(), Some([1u8; 32]));
        assert_eq!(Plaintext::Bool(true).as_bool(), Some(true));
    }
}
