//! Encrypted-value capability for the confidential auction.
//!
//! The auction core operates on opaque ciphertext handles and never inspects
//! plaintext. This crate defines that capability as a trait:
//!
//! - trivial encryption of contract-side constants
//! - admission of externally sealed inputs carrying a binding proof
//! - homomorphic compare/select/arithmetic over handles
//! - a reveal entry point reserved for the decryption oracle
//!
//! # Backends
//!
//! [`MockFheEngine`] is the only backend shipped here: a deterministic
//! keystream-masked plaintext store that enforces the exact same control
//! flow a production scheme would (handles in, handles out, plaintext only
//! through reveal). It is the seam for swapping in a real scheme without
//! touching the core.

pub mod error;
pub mod input;
pub mod mock;

pub use error::FheError;
pub use input::{seal_uint64, SealedInput};
pub use mock::MockFheEngine;

use auction_types::{CtHandle, Plaintext};

/// Homomorphic operations over ciphertext handles.
///
/// All binary arithmetic and comparison operate on `uint64` ciphertexts;
/// `select` is generic over the scalar kind as long as both arms agree.
/// Implementations return [`FheError`] for unknown handles or kind
/// mismatches; they never reveal plaintext through the operation results.
pub trait FheEngine {
    /// Encrypt a contract-side constant.
    fn encrypt(&mut self, value: Plaintext) -> CtHandle;

    /// Admit an externally sealed `uint64` input, checking its binding
    /// proof. This is how client bids enter the engine.
    fn verify_external(&mut self, ciphertext: &[u8], proof: &[u8]) -> Result<CtHandle, FheError>;

    /// Encrypted strictly-greater-than; returns an encrypted bool.
    fn gt(&mut self, lhs: CtHandle, rhs: CtHandle) -> Result<CtHandle, FheError>;

    /// Encrypted multiplexer: `cond ? if_true : if_false`.
    fn select(
        &mut self,
        cond: CtHandle,
        if_true: CtHandle,
        if_false: CtHandle,
    ) -> Result<CtHandle, FheError>;

    /// Encrypted wrapping addition.
    fn add(&mut self, lhs: CtHandle, rhs: CtHandle) -> Result<CtHandle, FheError>;

    /// Encrypted wrapping subtraction.
    fn sub(&mut self, lhs: CtHandle, rhs: CtHandle) -> Result<CtHandle, FheError>;

    /// Encrypted wrapping multiplication.
    fn mul(&mut self, lhs: CtHandle, rhs: CtHandle) -> Result<CtHandle, FheError>;

    /// Encrypted integer division.
    fn div(&mut self, lhs: CtHandle, rhs: CtHandle) -> Result<CtHandle, FheError>;

    /// Encrypted equality-to-zero; returns an encrypted bool. Defined for
    /// `uint64` and `address` ciphertexts.
    fn is_zero(&mut self, value: CtHandle) -> Result<CtHandle, FheError>;

    /// Reveal the plaintext behind a handle.
    ///
    /// Only the decryption oracle may call this; the auction core has no
    /// path to it.
    fn reveal(&self, handle: CtHandle) -> Result<Plaintext, FheError>;
}
