//! Call message types for the auction module.

use auction_fhe::FheEngine;
use auction_types::{Address, DecryptionGateway, RequestId};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::handlers::{self, CallContext, HandlerResult, Payout};
use crate::state::AuctionLedger;

/// Call messages for the auction module.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub enum AuctionCall {
    // === Lifecycle ===
    /// Open a session; the caller becomes admin.
    StartAuction { duration: u64 },

    /// Set the item description (admin).
    SetAuctionItem { item: String },

    /// Close bidding (admin).
    EndAuction,

    /// Clear the session and return to idle (admin).
    ResetAuction,

    // === Bidding ===
    /// Submit a sealed bid; the attached call value is the deposit.
    PlaceBid {
        ciphertext: Vec<u8>,
        input_proof: Vec<u8>,
    },

    // === Reveal & settlement ===
    /// Fire the winner-identity and winning-amount reveal requests (admin).
    RequestDecryption,

    /// Claim the caller's deposit refund after the reveal.
    Refund,

    /// Reveal and withdraw the accumulated proceeds (admin).
    WithdrawTotalProceeds,

    // === Oracle callbacks ===
    /// Winner-identity reveal delivery (oracle only).
    DecryptBidderCallback {
        request_id: RequestId,
        cleartext: Address,
        proof: [u8; 32],
    },

    /// Winning-amount reveal delivery (oracle only).
    DecryptAmountCallback {
        request_id: RequestId,
        cleartext: u64,
        proof: [u8; 32],
    },

    /// Aggregate-proceeds reveal delivery (oracle only).
    DecryptTotalAmountCallback {
        request_id: RequestId,
        cleartext: u64,
        proof: [u8; 32],
    },
}

/// Effect of a successfully applied call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// State changed; nothing owed to anyone.
    Unit,
    /// State changed and a transfer is owed to an identity.
    Payout(Payout),
}

/// Route a call message to its handler.
pub fn apply_call(
    state: &mut AuctionLedger,
    fhe: &mut impl FheEngine,
    gateway: &mut impl DecryptionGateway,
    ctx: &CallContext,
    call: AuctionCall,
) -> HandlerResult<CallOutcome> {
    match call {
        AuctionCall::StartAuction { duration } => {
            handlers::handle_start_auction(state, fhe, ctx, duration)?;
            Ok(CallOutcome::Unit)
        }
        AuctionCall::SetAuctionItem { item } => {
            handlers::handle_set_auction_item(state, ctx, item)?;
            Ok(CallOutcome::Unit)
        }
        AuctionCall::EndAuction => {
            handlers::handle_end_auction(state, ctx)?;
            Ok(CallOutcome::Unit)
        }
        AuctionCall::ResetAuction => {
            handlers::handle_reset_auction(state, ctx)?;
            Ok(CallOutcome::Unit)
        }
        AuctionCall::PlaceBid {
            ciphertext,
            input_proof,
        } => {
            handlers::handle_place_bid(state, fhe, ctx, &ciphertext, &input_proof)?;
            Ok(CallOutcome::Unit)
        }
        AuctionCall::RequestDecryption => {
            handlers::handle_request_decryption(state, ctx, gateway)?;
            Ok(CallOutcome::Unit)
        }
        AuctionCall::Refund => {
            let payout = handlers::handle_refund(state, ctx)?;
            Ok(CallOutcome::Payout(payout))
        }
        AuctionCall::WithdrawTotalProceeds => {
            handlers::handle_withdraw_total_proceeds(state, ctx, gateway)?;
            Ok(CallOutcome::Unit)
        }
        AuctionCall::DecryptBidderCallback {
            request_id,
            cleartext,
            proof,
        } => {
            handlers::handle_callback_bidder(state, ctx, request_id, cleartext, &proof)?;
            Ok(CallOutcome::Unit)
        }
        AuctionCall::DecryptAmountCallback {
            request_id,
            cleartext,
            proof,
        } => {
            handlers::handle_callback_amount(state, fhe, ctx, request_id, cleartext, &proof)?;
            Ok(CallOutcome::Unit)
        }
        AuctionCall::DecryptTotalAmountCallback {
            request_id,
            cleartext,
            proof,
        } => {
            let payout =
                handlers::handle_callback_total_amount(state, fhe, ctx, request_id, cleartext, &proof)?;
            Ok(CallOutcome::Payout(payout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::AuctionGenesisConfig;
    use auction_fhe::MockFheEngine;
    use auction_types::CtHandle;

    #[derive(Default)]
    struct NullGateway(u64);

    impl DecryptionGateway for NullGateway {
        fn request_decryption(&mut self, _handles: Vec<CtHandle>) -> RequestId {
            self.0 += 1;
            RequestId(self.0)
        }
    }

    #[test]
    fn test_call_roundtrip_serialization() {
        let call = AuctionCall::PlaceBid {
            ciphertext: vec![1, 2, 3],
            input_proof: vec![4, 5, 6],
        };
        let encoded = borsh::to_vec(&call).unwrap();
        let decoded: AuctionCall = borsh::from_slice(&encoded).unwrap();
        assert!(matches!(decoded, AuctionCall::PlaceBid { .. }));
    }

    #[test]
    fn test_apply_call_routes_start() {
        let mut fhe = MockFheEngine::new();
        let genesis = AuctionGenesisConfig::new([0xee; 32]);
        let mut state = AuctionLedger::new(&genesis, &mut fhe);
        let mut gateway = NullGateway::default();
        let ctx = CallContext {
            sender: [1u8; 32],
            block_height: 1,
            timestamp: 1_000,
            value: 0,
        };

        let outcome = apply_call(
            &mut state,
            &mut fhe,
            &mut gateway,
            &ctx,
            AuctionCall::StartAuction { duration: 100 },
        )
        .unwrap();
        assert_eq!(outcome, CallOutcome::Unit);
        assert_eq!(state.admin, Some([1u8; 32]));
    }
}
