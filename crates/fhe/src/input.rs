//! Sealed external inputs.
//!
//! Clients seal a bid amount off-contract and submit the resulting
//! ciphertext together with a binding proof. The wire format is
//! `salt (32 bytes) || masked value (8 bytes)`, where the mask is a
//! SHA-256-derived keystream over the salt and the proof is a digest over
//! salt and masked bytes. [`MockFheEngine::verify_external`] recomputes the
//! proof and unmasks the value.
//!
//! [`MockFheEngine::verify_external`]: crate::MockFheEngine

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::FheError;

/// Byte length of a sealed `uint64` input: 32-byte salt + 8 masked bytes.
pub const SEALED_UINT64_LEN: usize = 40;

const MASK_TAG: &[u8] = b"FHE_INPUT_V1:";
const PROOF_TAG: &[u8] = b"FHE_INPUT_PROOF_V1:";

/// A sealed input ready for submission: ciphertext bytes plus the binding
/// proof the engine checks on admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedInput {
    pub ciphertext: Vec<u8>,
    pub proof: Vec<u8>,
}

/// Seal a `uint64` value under a fresh random salt.
pub fn seal_uint64(value: u64, rng: &mut impl RngCore) -> SealedInput {
    let mut salt = [0u8; 32];
    rng.fill_bytes(&mut salt);

    let mask = keystream(&salt);
    let mut masked = value.to_le_bytes();
    for (byte, key) in masked.iter_mut().zip(mask.iter()) {
        *byte ^= key;
    }

    let mut ciphertext = Vec::with_capacity(SEALED_UINT64_LEN);
    ciphertext.extend_from_slice(&salt);
    ciphertext.extend_from_slice(&masked);

    let proof = input_proof(&salt, &masked).to_vec();
    SealedInput { ciphertext, proof }
}

/// Check the binding proof and recover the sealed value.
pub(crate) fn open_sealed_uint64(ciphertext: &[u8], proof: &[u8]) -> Result<u64, FheError> {
    if ciphertext.len() != SEALED_UINT64_LEN {
        return Err(FheError::MalformedCiphertext);
    }
    let (salt, masked) = ciphertext.split_at(32);

    let expected = input_proof(salt, masked);
    if proof != expected {
        return Err(FheError::InvalidInputProof);
    }

    let mask = keystream(salt);
    let mut value_bytes = [0u8; 8];
    for (i, byte) in masked.iter().enumerate() {
        value_bytes[i] = byte ^ mask[i];
    }
    Ok(u64::from_le_bytes(value_bytes))
}

fn keystream(salt: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(MASK_TAG);
    hasher.update(salt);
    hasher.finalize().into()
}

fn input_proof(salt: &[u8], masked: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PROOF_TAG);
    hasher.update(salt);
    hasher.update(masked);
    hasher.finalize().into()
}
