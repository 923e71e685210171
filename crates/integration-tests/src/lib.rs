//! End-to-end integration tests for the confidential sealed-bid auction.
//!
//! These tests exercise the full lifecycle against the real oracle
//! stand-in:
//! 1. Session start (open admin slot)
//! 2. Sealed bid submission and encrypted running maximum
//! 3. Two-phase winner reveal under every callback ordering
//! 4. Refund settlement
//! 5. Proceeds withdrawal and session reset

#![cfg(test)]

use auction_fhe::{seal_uint64, FheEngine, MockFheEngine};
use auction_module::{
    handlers, AuctionError, AuctionEvent, AuctionGenesisConfig, AuctionLedger, CallContext, Payout,
};
use auction_oracle::DecryptionOracle;
use auction_types::{Address, AuctionPhase, Plaintext, RequestId, ZERO_ADDRESS};
use rand::rngs::OsRng;

const ORACLE: Address = [0xee; 32];
const ADMIN: Address = [1u8; 32];
const ALICE: Address = [2u8; 32];
const BOB: Address = [3u8; 32];
const CAROL: Address = [4u8; 32];

/// Minimal chain double: the ledger, the FHE engine, the oracle, and a
/// clock. Callback delivery routes through the same matching an embedding
/// runtime would do.
struct TestChain {
    ledger: AuctionLedger,
    fhe: MockFheEngine,
    oracle: DecryptionOracle,
    timestamp: u64,
}

impl TestChain {
    fn new() -> Self {
        let mut fhe = MockFheEngine::new();
        let genesis = AuctionGenesisConfig::new(ORACLE);
        let ledger = AuctionLedger::new(&genesis, &mut fhe);
        Self {
            ledger,
            fhe,
            oracle: DecryptionOracle::new(),
            timestamp: 1_000,
        }
    }

    fn ctx(&self, sender: Address, value: u64) -> CallContext {
        CallContext {
            sender,
            block_height: 0,
            timestamp: self.timestamp,
            value,
        }
    }

    fn start(&mut self, sender: Address, duration: u64) -> Result<(), AuctionError> {
        let ctx = self.ctx(sender, 0);
        handlers::handle_start_auction(&mut self.ledger, &mut self.fhe, &ctx, duration)
    }

    fn bid(&mut self, sender: Address, amount: u64, deposit: u64) -> Result<(), AuctionError> {
        let sealed = seal_uint64(amount, &mut OsRng);
        let ctx = self.ctx(sender, deposit);
        handlers::handle_place_bid(
            &mut self.ledger,
            &mut self.fhe,
            &ctx,
            &sealed.ciphertext,
            &sealed.proof,
        )
    }

    fn end(&mut self, sender: Address) -> Result<(), AuctionError> {
        let ctx = self.ctx(sender, 0);
        handlers::handle_end_auction(&mut self.ledger, &ctx)
    }

    fn request_decryption(&mut self, sender: Address) -> Result<(), AuctionError> {
        let ctx = self.ctx(sender, 0);
        handlers::handle_request_decryption(&mut self.ledger, &ctx, &mut self.oracle)
    }

    fn withdraw(&mut self, sender: Address) -> Result<(), AuctionError> {
        let ctx = self.ctx(sender, 0);
        handlers::handle_withdraw_total_proceeds(&mut self.ledger, &ctx, &mut self.oracle)
    }

    fn refund(&mut self, sender: Address) -> Result<Payout, AuctionError> {
        let ctx = self.ctx(sender, 0);
        handlers::handle_refund(&mut self.ledger, &ctx)
    }

    fn reset(&mut self, sender: Address) -> Result<(), AuctionError> {
        let ctx = self.ctx(sender, 0);
        handlers::handle_reset_auction(&mut self.ledger, &ctx)
    }

    /// Deliver one oracle callback and route it to the matching handler,
    /// the way the embedding runtime would.
    fn deliver(&mut self, id: RequestId) -> Result<Option<Payout>, AuctionError> {
        let callback = self
            .oracle
            .deliver(&self.fhe, id)
            .expect("oracle had no such pending request");
        let ctx = self.ctx(ORACLE, 0);

        if self.ledger.pending.bidder.in_flight() == Some(id) {
            let bidder = callback.values[0].as_address().expect("expected address");
            handlers::handle_callback_bidder(
                &mut self.ledger,
                &ctx,
                id,
                bidder,
                &callback.proof,
            )?;
            return Ok(None);
        }
        if self.ledger.pending.amount.in_flight() == Some(id) {
            let amount = callback.values[0].as_uint64().expect("expected uint64");
            handlers::handle_callback_amount(
                &mut self.ledger,
                &mut self.fhe,
                &ctx,
                id,
                amount,
                &callback.proof,
            )?;
            return Ok(None);
        }
        let total = callback.values[0].as_uint64().expect("expected uint64");
        let payout = handlers::handle_callback_total_amount(
            &mut self.ledger,
            &mut self.fhe,
            &ctx,
            id,
            total,
            &callback.proof,
        )?;
        Ok(Some(payout))
    }

    fn bidder_request(&self) -> RequestId {
        self.ledger.pending.bidder.in_flight().expect("no bidder request")
    }

    fn amount_request(&self) -> RequestId {
        self.ledger.pending.amount.in_flight().expect("no amount request")
    }

    fn total_request(&self) -> RequestId {
        self.ledger.pending.total.expect("no total request").request_id
    }

    fn announced_events(&mut self) -> Vec<AuctionEvent> {
        self.ledger
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, AuctionEvent::WinnerAnnounced { .. }))
            .collect()
    }
}

/// Run one complete session: three bids, reveal with the bidder callback
/// first, refunds for everyone.
#[test]
fn test_full_auction_lifecycle() {
    let mut chain = TestChain::new();

    // ========================================
    // Phase 1: Session start
    // ========================================

    chain.start(ADMIN, 500).expect("start failed");
    assert_eq!(chain.ledger.admin, Some(ADMIN));
    println!("Session started by admin");

    // ========================================
    // Phase 2: Sealed bids
    // ========================================

    chain.timestamp = 1_100;
    chain.bid(ALICE, 100, 150).expect("bid A failed");
    chain.bid(BOB, 300, 400).expect("bid B failed");
    chain.bid(CAROL, 200, 250).expect("bid C failed");
    assert_eq!(chain.ledger.pool, 800);
    println!("3 sealed bids submitted");

    // ========================================
    // Phase 3: Close and reveal
    // ========================================

    chain.timestamp = 1_600;
    chain.end(ADMIN).expect("end failed");
    chain.request_decryption(ADMIN).expect("request failed");
    assert_eq!(chain.oracle.pending_requests().len(), 2);

    let bidder_id = chain.bidder_request();
    let amount_id = chain.amount_request();
    chain.deliver(bidder_id).expect("bidder callback failed");
    // one half revealed: still not announced
    assert!(chain.announced_events().is_empty());
    chain.deliver(amount_id).expect("amount callback failed");

    let announced = chain.announced_events();
    assert_eq!(
        announced,
        vec![AuctionEvent::WinnerAnnounced {
            winner: BOB,
            amount: 300
        }]
    );
    println!("Winner announced: B at 300");

    // ========================================
    // Phase 4: Refund settlement
    // ========================================

    assert_eq!(chain.refund(ALICE).unwrap(), Payout { to: ALICE, amount: 150 });
    assert_eq!(chain.refund(CAROL).unwrap(), Payout { to: CAROL, amount: 250 });
    assert_eq!(chain.refund(BOB).unwrap(), Payout { to: BOB, amount: 100 });
    assert_eq!(chain.refund(BOB), Err(AuctionError::NoDeposit));
    assert_eq!(chain.ledger.pool, 300);
    println!("Refunds settled; proceeds retained in pool");

    // ========================================
    // Phase 5: Withdrawal and reset
    // ========================================

    chain.withdraw(ADMIN).expect("withdraw failed");
    let total_id = chain.total_request();
    let payout = chain.deliver(total_id).expect("total callback failed");
    assert_eq!(payout, Some(Payout { to: ADMIN, amount: 300 }));
    assert_eq!(chain.ledger.decrypted_total, 300);
    assert_eq!(chain.ledger.pool, 0);

    chain.reset(ADMIN).expect("reset failed");
    assert_eq!(chain.ledger.phase, AuctionPhase::Idle);
    assert_eq!(chain.ledger.admin, None);
    println!("Session withdrawn and reset");
}

/// Same scenario, amount callback first: the announcement must come from
/// the bidder callback instead, with identical results.
#[test]
fn test_reveal_order_is_irrelevant() {
    let mut chain = TestChain::new();
    chain.start(ADMIN, 500).unwrap();
    chain.timestamp = 1_100;
    chain.bid(ALICE, 100, 150).unwrap();
    chain.bid(BOB, 300, 400).unwrap();
    chain.bid(CAROL, 200, 250).unwrap();
    chain.timestamp = 1_600;
    chain.end(ADMIN).unwrap();
    chain.request_decryption(ADMIN).unwrap();

    let amount_id = chain.amount_request();
    let bidder_id = chain.bidder_request();

    chain.deliver(amount_id).unwrap();
    assert_eq!(chain.ledger.winning_amount, 300);
    assert!(chain.announced_events().is_empty());

    chain.deliver(bidder_id).unwrap();
    let announced = chain.announced_events();
    assert_eq!(
        announced,
        vec![AuctionEvent::WinnerAnnounced {
            winner: BOB,
            amount: 300
        }]
    );

    // refunds behave identically regardless of reveal order
    assert_eq!(chain.refund(ALICE).unwrap().amount, 150);
    assert_eq!(chain.refund(BOB).unwrap().amount, 100);
    assert_eq!(chain.refund(CAROL).unwrap().amount, 250);
}

/// Only the first starter of an idle ledger becomes admin.
#[test]
fn test_admin_exclusivity() {
    let mut chain = TestChain::new();
    chain.start(ALICE, 500).unwrap();
    assert_eq!(chain.start(BOB, 500), Err(AuctionError::AlreadyStarted));
    assert_eq!(chain.start(CAROL, 500), Err(AuctionError::AlreadyStarted));
    assert_eq!(chain.ledger.admin, Some(ALICE));
}

/// An equal later bid must not displace the incumbent maximum.
#[test]
fn test_tie_break_keeps_first_bidder() {
    let mut chain = TestChain::new();
    chain.start(ADMIN, 500).unwrap();
    chain.timestamp = 1_100;
    chain.bid(ALICE, 300, 350).unwrap();
    chain.bid(BOB, 300, 350).unwrap();
    chain.timestamp = 1_600;
    chain.end(ADMIN).unwrap();
    chain.request_decryption(ADMIN).unwrap();

    let bidder_id = chain.bidder_request();
    let amount_id = chain.amount_request();
    chain.deliver(amount_id).unwrap();
    chain.deliver(bidder_id).unwrap();

    assert_eq!(chain.ledger.winner, ALICE);
    assert_eq!(chain.ledger.winning_amount, 300);
}

/// A second session behaves like the first, and the encrypted accumulator
/// carries winning amounts across the reset.
#[test]
fn test_reset_reuse_and_accumulator() {
    let mut chain = TestChain::new();

    // session 1: BOB wins at 300
    chain.start(ADMIN, 500).unwrap();
    chain.timestamp = 1_100;
    chain.bid(BOB, 300, 400).unwrap();
    chain.timestamp = 1_600;
    chain.end(ADMIN).unwrap();
    chain.request_decryption(ADMIN).unwrap();
    let (b, a) = (chain.bidder_request(), chain.amount_request());
    chain.deliver(b).unwrap();
    chain.deliver(a).unwrap();
    chain.refund(BOB).unwrap();
    chain.reset(ADMIN).unwrap();

    // session 2: a fresh admin, CAROL wins at 80
    chain.timestamp = 2_000;
    chain.start(ALICE, 500).unwrap();
    assert_eq!(chain.ledger.admin, Some(ALICE));
    chain.timestamp = 2_100;
    chain.bid(CAROL, 80, 120).unwrap();
    chain.timestamp = 2_600;
    chain.end(ALICE).unwrap();
    chain.request_decryption(ALICE).unwrap();
    let (b, a) = (chain.bidder_request(), chain.amount_request());
    chain.deliver(a).unwrap();
    chain.deliver(b).unwrap();

    assert_eq!(chain.ledger.winner, CAROL);
    assert_eq!(chain.ledger.winning_amount, 80);

    // both sessions' winning amounts sit in the accumulator
    assert_eq!(
        chain.fhe.reveal(chain.ledger.total_winning_amount),
        Ok(Plaintext::Uint64(380))
    );

    // withdrawal reveals the aggregate, not any single bid
    chain.refund(CAROL).unwrap();
    chain.withdraw(ALICE).unwrap();
    let payout = chain.deliver(chain.total_request()).unwrap();
    assert_eq!(payout, Some(Payout { to: ALICE, amount: 380 }));
    assert_eq!(chain.ledger.decrypted_total, 380);
}

/// Spec scenario: a second withdrawal before the first callback resolves
/// fails with the pending error; after the callback the lock still holds
/// until the next session completes.
#[test]
fn test_withdrawal_lock() {
    let mut chain = TestChain::new();
    chain.start(ADMIN, 500).unwrap();
    chain.timestamp = 1_100;
    chain.bid(BOB, 300, 400).unwrap();
    chain.timestamp = 1_600;
    chain.end(ADMIN).unwrap();
    chain.request_decryption(ADMIN).unwrap();
    let (b, a) = (chain.bidder_request(), chain.amount_request());
    chain.deliver(b).unwrap();
    chain.deliver(a).unwrap();
    chain.refund(BOB).unwrap();

    chain.withdraw(ADMIN).unwrap();
    // second request while the callback is still outstanding
    assert_eq!(chain.withdraw(ADMIN), Err(AuctionError::WithdrawalPending));

    chain.deliver(chain.total_request()).unwrap();
    // locked until the next session's amount callback clears it
    assert_eq!(chain.withdraw(ADMIN), Err(AuctionError::WithdrawalPending));

    chain.reset(ADMIN).unwrap();
    chain.timestamp = 2_000;
    chain.start(ADMIN, 500).unwrap();
    chain.timestamp = 2_100;
    chain.bid(CAROL, 50, 60).unwrap();
    chain.timestamp = 2_600;
    chain.end(ADMIN).unwrap();
    chain.request_decryption(ADMIN).unwrap();
    let (b, a) = (chain.bidder_request(), chain.amount_request());
    chain.deliver(b).unwrap();
    chain.deliver(a).unwrap();

    // lock cleared; the new aggregate is just this session's amount
    chain.refund(CAROL).unwrap();
    chain.withdraw(ADMIN).unwrap();
    let payout = chain.deliver(chain.total_request()).unwrap();
    assert_eq!(payout, Some(Payout { to: ADMIN, amount: 50 }));
}

/// Forged or replayed callbacks are rejected without ledger effect, and
/// the legitimate delivery still lands afterwards.
#[test]
fn test_bad_callbacks_leave_ledger_untouched() {
    let mut chain = TestChain::new();
    chain.start(ADMIN, 500).unwrap();
    chain.timestamp = 1_100;
    chain.bid(BOB, 300, 400).unwrap();
    chain.timestamp = 1_600;
    chain.end(ADMIN).unwrap();
    chain.request_decryption(ADMIN).unwrap();

    let bidder_id = chain.bidder_request();
    let amount_id = chain.amount_request();

    // forged amount: proof does not bind the claimed cleartext
    let forged = auction_types::callback_digest(amount_id, &[Plaintext::Uint64(1)]);
    let ctx = chain.ctx(ORACLE, 0);
    let result = handlers::handle_callback_amount(
        &mut chain.ledger,
        &mut chain.fhe,
        &ctx,
        amount_id,
        999,
        &forged,
    );
    assert_eq!(result, Err(AuctionError::InvalidProof));
    assert_eq!(chain.ledger.winning_amount, 0);

    // non-oracle caller with a valid-looking payload
    let proof = auction_types::callback_digest(bidder_id, &[Plaintext::Addr(BOB)]);
    let intruder_ctx = chain.ctx(ADMIN, 0);
    let result = handlers::handle_callback_bidder(
        &mut chain.ledger,
        &intruder_ctx,
        bidder_id,
        BOB,
        &proof,
    );
    assert_eq!(result, Err(AuctionError::NotOracle));
    assert_eq!(chain.ledger.winner, ZERO_ADDRESS);

    // the real deliveries still succeed
    chain.deliver(bidder_id).unwrap();
    chain.deliver(amount_id).unwrap();
    assert_eq!(chain.ledger.winner, BOB);
    assert_eq!(chain.ledger.winning_amount, 300);
}

/// An oracle that never answers leaves the affected request pending
/// forever; nothing times out and nothing else is blocked.
#[test]
fn test_oracle_silence_keeps_request_pending() {
    let mut chain = TestChain::new();
    chain.start(ADMIN, 500).unwrap();
    chain.timestamp = 1_100;
    chain.bid(BOB, 300, 400).unwrap();
    chain.timestamp = 1_600;
    chain.end(ADMIN).unwrap();
    chain.request_decryption(ADMIN).unwrap();

    // nobody pumps the oracle
    assert_eq!(chain.oracle.pending_requests().len(), 2);
    assert_eq!(chain.refund(BOB), Err(AuctionError::WinnerNotAnnounced));
    assert_eq!(
        chain.request_decryption(ADMIN),
        Err(AuctionError::AlreadyRequested)
    );

    // queries and unrelated admin actions still work
    assert!(chain.ledger.phase.auction_ended());
    assert_eq!(chain.ledger.deposit_of(&BOB), 400);
}
