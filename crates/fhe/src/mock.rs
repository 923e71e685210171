//! Deterministic mock backend.
//!
//! Handles are SHA-256 digests over a monotonically increasing counter, so
//! runs are reproducible; the plaintext store is keyed by handle and is
//! reachable only through [`FheEngine::reveal`].

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use auction_types::{CtHandle, Plaintext};

use crate::error::FheError;
use crate::input::open_sealed_uint64;
use crate::FheEngine;

/// In-memory encrypted-value store enforcing the capability's control flow.
#[derive(Debug, Default)]
pub struct MockFheEngine {
    values: HashMap<CtHandle, Plaintext>,
    counter: u64,
}

impl MockFheEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live ciphertexts.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, value: Plaintext) -> CtHandle {
        self.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(b"CT_HANDLE_V1:");
        hasher.update(self.counter.to_le_bytes());
        let handle = CtHandle(hasher.finalize().into());
        self.values.insert(handle, value);
        handle
    }

    fn lookup(&self, handle: CtHandle) -> Result<Plaintext, FheError> {
        self.values
            .get(&handle)
            .copied()
            .ok_or(FheError::UnknownHandle)
    }

    fn lookup_uint64(&self, handle: CtHandle, op: &'static str) -> Result<u64, FheError> {
        let value = self.lookup(handle)?;
        value.as_uint64().ok_or(FheError::KindMismatch {
            op,
            expected: "uint64",
            got: value.kind(),
        })
    }

    fn lookup_bool(&self, handle: CtHandle, op: &'static str) -> Result<bool, FheError> {
        let value = self.lookup(handle)?;
        value.as_bool().ok_or(FheError::KindMismatch {
            op,
            expected: "bool",
            got: value.kind(),
        })
    }
}

impl FheEngine for MockFheEngine {
    fn encrypt(&mut self, value: Plaintext) -> CtHandle {
        self.insert(value)
    }

    fn verify_external(&mut self, ciphertext: &[u8], proof: &[u8]) -> Result<CtHandle, FheError> {
        let value = open_sealed_uint64(ciphertext, proof)?;
        Ok(self.insert(Plaintext::Uint64(value)))
    }

    fn gt(&mut self, lhs: CtHandle, rhs: CtHandle) -> Result<CtHandle, FheError> {
        let a = self.lookup_uint64(lhs, "gt")?;
        let b = self.lookup_uint64(rhs, "gt")?;
        Ok(self.insert(Plaintext::Bool(a > b)))
    }

    fn select(
        &mut self,
        cond: CtHandle,
        if_true: CtHandle,
        if_false: CtHandle,
    ) -> Result<CtHandle, FheError> {
        let cond = self.lookup_bool(cond, "select")?;
        let a = self.lookup(if_true)?;
        let b = self.lookup(if_false)?;
        if a.kind() != b.kind() {
            return Err(FheError::KindMismatch {
                op: "select",
                expected: a.kind(),
                got: b.kind(),
            });
        }
        Ok(self.insert(if cond { a } else { b }))
    }

    fn add(&mut self, lhs: CtHandle, rhs: CtHandle) -> Result<CtHandle, FheError> {
        let a = self.lookup_uint64(lhs, "add")?;
        let b = self.lookup_uint64(rhs, "add")?;
        Ok(self.insert(Plaintext::Uint64(a.wrapping_add(b))))
    }

    fn sub(&mut self, lhs: CtHandle, rhs: CtHandle) -> Result<CtHandle, FheError> {
        let a = self.lookup_uint64(lhs, "sub")?;
        let b = self.lookup_uint64(rhs, "sub")?;
        Ok(self.insert(Plaintext::Uint64(a.wrapping_sub(b))))
    }

    fn mul(&mut self, lhs: CtHandle, rhs: CtHandle) -> Result<CtHandle, FheError> {
        let a = self.lookup_uint64(lhs, "mul")?;
        let b = self.lookup_uint64(rhs, "mul")?;
        Ok(self.insert(Plaintext::Uint64(a.wrapping_mul(b))))
    }

    fn div(&mut self, lhs: CtHandle, rhs: CtHandle) -> Result<CtHandle, FheError> {
        let a = self.lookup_uint64(lhs, "div")?;
        let b = self.lookup_uint64(rhs, "div")?;
        if b == 0 {
            return Err(FheError::DivisionByZero);
        }
        Ok(self.insert(Plaintext::Uint64(a / b)))
    }

    fn is_zero(&mut self, value: CtHandle) -> Result<CtHandle, FheError> {
        let result = match self.lookup(value)? {
            Plaintext::Uint64(v) => v == 0,
            Plaintext::Addr(a) => a == auction_types::ZERO_ADDRESS,
            other => {
                return Err(FheError::KindMismatch {
                    op: "is_zero",
                    expected: "uint64 or address",
                    got: other.kind(),
                })
            }
        };
        Ok(self.insert(Plaintext::Bool(result)))
    }

    fn reveal(&self, handle: CtHandle) -> Result<Plaintext, FheError> {
        self.lookup(handle)
    }
}
