//! Encryption backend error types.

use thiserror::Error;

/// Errors surfaced by the encrypted-value capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FheError {
    #[error("Unknown ciphertext handle")]
    UnknownHandle,

    #[error("Scalar kind mismatch in {op}: expected {expected}, got {got}")]
    KindMismatch {
        op: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    #[error("Invalid input binding proof")]
    InvalidInputProof,

    #[error("Malformed sealed input")]
    MalformedCiphertext,

    #[error("Encrypted division by zero")]
    DivisionByZero,
}
