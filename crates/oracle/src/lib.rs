//! Decryption oracle stand-in.
//!
//! The auction core hands ciphertext handles to an external oracle and
//! receives plaintexts back through proof-carrying callbacks, in whatever
//! order the oracle chooses. This crate provides that collaborator for
//! local runs and tests:
//!
//! 1. The core issues requests through the [`DecryptionGateway`] seam
//! 2. Requests sit in a pending table until something pumps them
//! 3. Delivery reveals the handles through the FHE engine and produces an
//!    [`OracleCallback`] whose proof binds the cleartexts to the request id
//!
//! Delivery is exactly-once: a delivered request leaves the table, and a
//! second delivery attempt is an error. Nothing forces delivery at all —
//! a request left unpumped models an oracle that never responds.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use auction_fhe::{FheEngine, FheError};
use auction_types::{callback_digest, CtHandle, DecryptionGateway, OracleCallback, RequestId};

/// Errors that can occur during oracle delivery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Unknown or already delivered request id: {0}")]
    UnknownRequest(u64),

    #[error("Reveal failed: {0}")]
    Reveal(#[from] FheError),
}

/// Pending-request table with monotonically increasing, never-zero ids.
#[derive(Debug, Default)]
pub struct DecryptionOracle {
    pending: BTreeMap<RequestId, Vec<CtHandle>>,
    next_id: u64,
}

impl DecryptionOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of all requests awaiting delivery, in arrival order.
    pub fn pending_requests(&self) -> Vec<RequestId> {
        self.pending.keys().copied().collect()
    }

    pub fn is_pending(&self, request_id: RequestId) -> bool {
        self.pending.contains_key(&request_id)
    }

    /// Deliver one request, in any order the caller chooses.
    ///
    /// Reveals every handle in the request through the engine, removes the
    /// request from the table, and returns the proof-carrying callback
    /// payload.
    pub fn deliver(
        &mut self,
        fhe: &impl FheEngine,
        request_id: RequestId,
    ) -> Result<OracleCallback, OracleError> {
        let handles = self
            .pending
            .get(&request_id)
            .ok_or(OracleError::UnknownRequest(request_id.0))?;

        let mut values = Vec::with_capacity(handles.len());
        for handle in handles {
            values.push(fhe.reveal(*handle)?);
        }
        self.pending.remove(&request_id);

        info!(request_id = request_id.0, count = values.len(), "Delivered decryption request");

        Ok(OracleCallback {
            request_id,
            proof: callback_digest(request_id, &values),
            values,
        })
    }

    /// Deliver every pending request in arrival order.
    pub fn deliver_all(&mut self, fhe: &impl FheEngine) -> Result<Vec<OracleCallback>, OracleError> {
        let ids = self.pending_requests();
        let mut callbacks = Vec::with_capacity(ids.len());
        for id in ids {
            callbacks.push(self.deliver(fhe, id)?);
        }
        Ok(callbacks)
    }
}

impl DecryptionGateway for DecryptionOracle {
    fn request_decryption(&mut self, handles: Vec<CtHandle>) -> RequestId {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        debug!(request_id = id.0, handles = handles.len(), "Accepted decryption request");
        self.pending.insert(id, handles);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_fhe::MockFheEngine;
    use auction_types::Plaintext;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut fhe = MockFheEngine::new();
        let mut oracle = DecryptionOracle::new();
        let a = fhe.encrypt(Plaintext::Uint64(1));
        let b = fhe.encrypt(Plaintext::Uint64(2));

        assert_eq!(oracle.request_decryption(vec![a]), RequestId(1));
        assert_eq!(oracle.request_decryption(vec![b]), RequestId(2));
        assert_eq!(oracle.pending_requests(), vec![RequestId(1), RequestId(2)]);
    }

    #[test]
    fn test_deliver_reveals_and_proves() {
        let mut fhe = MockFheEngine::new();
        let mut oracle = DecryptionOracle::new();
        let handle = fhe.encrypt(Plaintext::Uint64(300));
        let id = oracle.request_decryption(vec![handle]);

        let callback = oracle.deliver(&fhe, id).unwrap();
        assert_eq!(callback.request_id, id);
        assert_eq!(callback.values, vec![Plaintext::Uint64(300)]);
        assert_eq!(callback.proof, callback_digest(id, &callback.values));
        assert!(!oracle.is_pending(id));
    }

    #[test]
    fn test_deliver_out_of_order() {
        let mut fhe = MockFheEngine::new();
        let mut oracle = DecryptionOracle::new();
        let a = fhe.encrypt(Plaintext::Uint64(1));
        let b = fhe.encrypt(Plaintext::Addr([7u8; 32]));
        let first = oracle.request_decryption(vec![a]);
        let second = oracle.request_decryption(vec![b]);

        // later request first
        let cb2 = oracle.deliver(&fhe, second).unwrap();
        assert_eq!(cb2.values, vec![Plaintext::Addr([7u8; 32])]);
        let cb1 = oracle.deliver(&fhe, first).unwrap();
        assert_eq!(cb1.values, vec![Plaintext::Uint64(1)]);
    }

    #[test]
    fn test_delivery_is_exactly_once() {
        let mut fhe = MockFheEngine::new();
        let mut oracle = DecryptionOracle::new();
        let handle = fhe.encrypt(Plaintext::Uint64(300));
        let id = oracle.request_decryption(vec![handle]);

        oracle.deliver(&fhe, id).unwrap();
        assert_eq!(
            oracle.deliver(&fhe, id),
            Err(OracleError::UnknownRequest(id.0))
        );
    }

    #[test]
    fn test_unknown_request() {
        let fhe = MockFheEngine::new();
        let mut oracle = DecryptionOracle::new();
        assert_eq!(
            oracle.deliver(&fhe, RequestId(9)),
            Err(OracleError::UnknownRequest(9))
        );
    }

    #[test]
    fn test_deliver_all_drains_in_order() {
        let mut fhe = MockFheEngine::new();
        let mut oracle = DecryptionOracle::new();
        let a = fhe.encrypt(Plaintext::Uint64(1));
        let b = fhe.encrypt(Plaintext::Uint64(2));
        oracle.request_decryption(vec![a]);
        oracle.request_decryption(vec![b]);

        let callbacks = oracle.deliver_all(&fhe).unwrap();
        assert_eq!(callbacks.len(), 2);
        assert_eq!(callbacks[0].request_id, RequestId(1));
        assert_eq!(callbacks[1].request_id, RequestId(2));
        assert!(oracle.pending_requests().is_empty());
    }

    #[test]
    fn test_undelivered_request_stays_pending() {
        let mut fhe = MockFheEngine::new();
        let mut oracle = DecryptionOracle::new();
        let handle = fhe.encrypt(Plaintext::Uint64(1));
        let id = oracle.request_decryption(vec![handle]);
        // nothing pumps it; the request just sits there
        assert!(oracle.is_pending(id));
    }
}
