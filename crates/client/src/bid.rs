//! Bid sealing.

use auction_fhe::seal_uint64;
use rand::RngCore;

/// A sealed bid ready for submission: the ciphertext bytes and the binding
/// proof the contract-side engine verifies on admission.
#[derive(Clone, Debug)]
pub struct SealedBid {
    pub ciphertext: Vec<u8>,
    pub proof: Vec<u8>,
}

/// Seal a bid amount for encrypted submission.
///
/// The amount never travels in the clear; only the attached deposit is
/// visible on-chain.
pub fn encrypt_bid(amount: u64, rng: &mut impl RngCore) -> SealedBid {
    let sealed = seal_uint64(amount, rng);
    SealedBid {
        ciphertext: sealed.ciphertext,
        proof: sealed.proof,
    }
}
