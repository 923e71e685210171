//! Call handlers for the auction module.
//!
//! These functions implement the business logic for each call type. Every
//! handler validates before mutating, so a failed call leaves the ledger
//! exactly as it found it.

use auction_fhe::FheEngine;
use auction_types::{
    callback_digest, Address, AuctionPhase, DecryptionGateway, Plaintext, RequestId, WinnerInfo,
    ZERO_ADDRESS,
};

use crate::error::AuctionError;
use crate::events::AuctionEvent;
use crate::state::{AuctionLedger, EncryptedMaximum, PendingWithdrawal, RevealSlot};

/// Context provided by the runtime for each call.
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Current block height
    pub block_height: u64,
    /// Current timestamp
    pub timestamp: u64,
    /// Value attached to the call (the bid deposit)
    pub value: u64,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

/// A transfer owed to an identity as the result of a settlement call. The
/// embedder moves the funds; the ledger has already released them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payout {
    pub to: Address,
    pub amount: u64,
}

fn require_admin(state: &AuctionLedger, ctx: &CallContext) -> HandlerResult<Address> {
    match state.admin {
        Some(admin) if admin == ctx.sender => Ok(admin),
        _ => Err(AuctionError::NotAdmin),
    }
}

fn require_oracle(state: &AuctionLedger, ctx: &CallContext) -> HandlerResult<()> {
    if ctx.sender != state.oracle_authority {
        return Err(AuctionError::NotOracle);
    }
    Ok(())
}

/// Fire the winner-announced notification once both halves of the reveal
/// are in. Called by both reveal callbacks; only the one that completes
/// the pair observes both halves non-zero.
fn maybe_announce_winner(state: &mut AuctionLedger) {
    if state.winner_announced() {
        state.emit(AuctionEvent::WinnerAnnounced {
            winner: state.winner,
            amount: state.winning_amount,
        });
    }
}

// =========================
// STATE MACHINE
// =========================

/// Handle StartAuction. The first caller in an idle ledger becomes admin
/// for the session.
pub fn handle_start_auction(
    state: &mut AuctionLedger,
    fhe: &mut impl FheEngine,
    ctx: &CallContext,
    duration: u64,
) -> HandlerResult<()> {
    if state.phase != AuctionPhase::Idle || state.admin.is_some() {
        return Err(AuctionError::AlreadyStarted);
    }
    if duration == 0 {
        return Err(AuctionError::InvalidDuration);
    }
    let start_time = ctx.timestamp;
    let end_time = start_time
        .checked_add(duration)
        .ok_or(AuctionError::InvalidDuration)?;

    state.admin = Some(ctx.sender);
    state.start_time = start_time;
    state.end_time = end_time;
    // Arm the running maximum with encryptions of zero so the first real
    // bid always displaces it.
    state.highest = Some(EncryptedMaximum {
        bid: fhe.encrypt(Plaintext::Uint64(0)),
        bidder: fhe.encrypt(Plaintext::Addr(ZERO_ADDRESS)),
    });
    state.phase = AuctionPhase::Started;
    state.emit(AuctionEvent::AuctionStarted {
        admin: ctx.sender,
        start_time,
        end_time,
    });
    Ok(())
}

/// Handle SetAuctionItem. Admin only; not restricted by phase.
pub fn handle_set_auction_item(
    state: &mut AuctionLedger,
    ctx: &CallContext,
    item: String,
) -> HandlerResult<()> {
    require_admin(state, ctx)?;
    state.item = item;
    Ok(())
}

/// Handle EndAuction. Closes bidding; no further bids are accepted.
pub fn handle_end_auction(state: &mut AuctionLedger, ctx: &CallContext) -> HandlerResult<()> {
    require_admin(state, ctx)?;
    if state.phase != AuctionPhase::Started {
        return Err(AuctionError::NotActive);
    }
    state.phase = AuctionPhase::Ended;
    Ok(())
}

/// Handle ResetAuction. Clears session state and re-opens the admin slot;
/// the all-time proceeds accumulators survive.
pub fn handle_reset_auction(state: &mut AuctionLedger, ctx: &CallContext) -> HandlerResult<()> {
    require_admin(state, ctx)?;
    if state.phase != AuctionPhase::Ended {
        return Err(AuctionError::NotEnded);
    }
    state.clear_session();
    Ok(())
}

// =========================
// BID ENGINE
// =========================

/// Handle PlaceBid.
///
/// The bid amount stays encrypted end to end; the running maximum is
/// maintained with an encrypted strict compare and two selects driven by
/// the same selector, so bid and bidder can never diverge. The deposit is
/// a plaintext upper-bound commitment and is never checked against the
/// encrypted amount.
pub fn handle_place_bid(
    state: &mut AuctionLedger,
    fhe: &mut impl FheEngine,
    ctx: &CallContext,
    ciphertext: &[u8],
    input_proof: &[u8],
) -> HandlerResult<()> {
    if state.phase != AuctionPhase::Started
        || ctx.timestamp < state.start_time
        || ctx.timestamp > state.end_time
    {
        return Err(AuctionError::AuctionNotActive);
    }
    if ctx.value == 0 {
        return Err(AuctionError::DepositRequired);
    }
    let highest = state.highest.ok_or(AuctionError::AuctionNotActive)?;

    let bid = fhe
        .verify_external(ciphertext, input_proof)
        .map_err(|_| AuctionError::InvalidProof)?;
    let sender_ct = fhe.encrypt(Plaintext::Addr(ctx.sender));

    // Strict greater-than: an equal later bid does not displace the
    // incumbent, so the first bidder at the maximum keeps priority.
    let is_higher = fhe.gt(bid, highest.bid)?;
    let new_bid = fhe.select(is_higher, bid, highest.bid)?;
    let new_bidder = fhe.select(is_higher, sender_ct, highest.bidder)?;

    state.highest = Some(EncryptedMaximum {
        bid: new_bid,
        bidder: new_bidder,
    });
    state.bids.insert(ctx.sender, bid);
    *state.deposits.entry(ctx.sender).or_insert(0) += ctx.value;
    state.bidders.push(ctx.sender);
    state.pool += ctx.value;
    Ok(())
}

// =========================
// DECRYPTION-CALLBACK ROUTER
// =========================

/// Handle RequestDecryption. Fires the two independent reveal requests
/// (winner identity, winning amount); their callbacks may arrive in any
/// order.
pub fn handle_request_decryption(
    state: &mut AuctionLedger,
    ctx: &CallContext,
    gateway: &mut impl DecryptionGateway,
) -> HandlerResult<()> {
    require_admin(state, ctx)?;
    if state.phase != AuctionPhase::Ended {
        return Err(AuctionError::NotEnded);
    }
    if !state.pending.bidder.is_unarmed() || !state.pending.amount.is_unarmed() {
        return Err(AuctionError::AlreadyRequested);
    }
    let highest = state.highest.ok_or(AuctionError::NotEnded)?;

    let bidder_request = gateway.request_decryption(vec![highest.bidder]);
    let amount_request = gateway.request_decryption(vec![highest.bid]);
    state.pending.bidder = RevealSlot::InFlight(bidder_request);
    state.pending.amount = RevealSlot::InFlight(amount_request);
    Ok(())
}

/// Handle the winner-identity callback (oracle only).
///
/// A stale or mismatched request id, or a proof that does not bind the
/// cleartext to it, rejects the delivery without touching the ledger.
pub fn handle_callback_bidder(
    state: &mut AuctionLedger,
    ctx: &CallContext,
    request_id: RequestId,
    bidder: Address,
    proof: &[u8; 32],
) -> HandlerResult<()> {
    require_oracle(state, ctx)?;
    let expected = state
        .pending
        .bidder
        .in_flight()
        .filter(|id| *id == request_id)
        .ok_or(AuctionError::InvalidRequestId(request_id.0))?;
    if callback_digest(expected, &[Plaintext::Addr(bidder)]) != *proof {
        return Err(AuctionError::InvalidProof);
    }

    state.pending.bidder = RevealSlot::Done(request_id);
    state.winner = bidder;
    maybe_announce_winner(state);
    Ok(())
}

/// Handle the winning-amount callback (oracle only).
///
/// Besides publishing the amount, this folds it into the encrypted
/// all-time proceeds accumulator and re-opens the withdrawal gate for the
/// session.
pub fn handle_callback_amount(
    state: &mut AuctionLedger,
    fhe: &mut impl FheEngine,
    ctx: &CallContext,
    request_id: RequestId,
    amount: u64,
    proof: &[u8; 32],
) -> HandlerResult<()> {
    require_oracle(state, ctx)?;
    let expected = state
        .pending
        .amount
        .in_flight()
        .filter(|id| *id == request_id)
        .ok_or(AuctionError::InvalidRequestId(request_id.0))?;
    if callback_digest(expected, &[Plaintext::Uint64(amount)]) != *proof {
        return Err(AuctionError::InvalidProof);
    }

    let amount_ct = fhe.encrypt(Plaintext::Uint64(amount));
    let new_total = fhe.add(state.total_winning_amount, amount_ct)?;

    state.pending.amount = RevealSlot::Done(request_id);
    state.winning_amount = amount;
    state.total_winning_amount = new_total;
    state.withdraw_lock = false;
    maybe_announce_winner(state);
    Ok(())
}

/// Handle WithdrawTotalProceeds. Issues the coarse-grained reveal of the
/// encrypted accumulator; the payout happens in its callback.
pub fn handle_withdraw_total_proceeds(
    state: &mut AuctionLedger,
    ctx: &CallContext,
    gateway: &mut impl DecryptionGateway,
) -> HandlerResult<()> {
    let admin = require_admin(state, ctx)?;
    if state.withdraw_lock || state.pending.total.is_some() {
        return Err(AuctionError::WithdrawalPending);
    }
    let request_id = gateway.request_decryption(vec![state.total_winning_amount]);
    state.pending.total = Some(PendingWithdrawal {
        request_id,
        recipient: admin,
    });
    Ok(())
}

/// Handle the total-proceeds callback (oracle only). Publishes the
/// decrypted aggregate, zeroes the encrypted accumulator, locks further
/// withdrawals until the next session completes, and releases the payout
/// to the admin captured at request time.
pub fn handle_callback_total_amount(
    state: &mut AuctionLedger,
    fhe: &mut impl FheEngine,
    ctx: &CallContext,
    request_id: RequestId,
    total: u64,
    proof: &[u8; 32],
) -> HandlerResult<Payout> {
    require_oracle(state, ctx)?;
    let pending = state
        .pending
        .total
        .filter(|p| p.request_id == request_id)
        .ok_or(AuctionError::InvalidRequestId(request_id.0))?;
    if callback_digest(request_id, &[Plaintext::Uint64(total)]) != *proof {
        return Err(AuctionError::InvalidProof);
    }
    if state.pool < total {
        return Err(AuctionError::InsufficientValue {
            required: total,
            available: state.pool,
        });
    }

    state.pending.total = None;
    state.decrypted_total = total;
    state.total_winning_amount = fhe.encrypt(Plaintext::Uint64(0));
    state.withdraw_lock = true;
    state.pool -= total;
    state.emit(AuctionEvent::ProceedsWithdrawn {
        admin: pending.recipient,
        amount: total,
    });
    Ok(Payout {
        to: pending.recipient,
        amount: total,
    })
}

// =========================
// SETTLEMENT
// =========================

/// Handle Refund.
///
/// The deposit is zeroed before the payout leaves the ledger, so a
/// re-entrant second call finds nothing to refund. The winner's refund is
/// the deposit net of the revealed winning amount; a deposit smaller than
/// the winning amount is an explicit fault, not a clamp.
pub fn handle_refund(state: &mut AuctionLedger, ctx: &CallContext) -> HandlerResult<Payout> {
    if !state.winner_announced() {
        return Err(AuctionError::WinnerNotAnnounced);
    }
    let deposit = state.deposit_of(&ctx.sender);
    if deposit == 0 {
        return Err(AuctionError::NoDeposit);
    }
    let amount = if ctx.sender == state.winner {
        deposit
            .checked_sub(state.winning_amount)
            .ok_or(AuctionError::InsufficientValue {
                required: state.winning_amount,
                available: deposit,
            })?
    } else {
        deposit
    };
    if state.pool < amount {
        return Err(AuctionError::InsufficientValue {
            required: amount,
            available: state.pool,
        });
    }

    state.deposits.insert(ctx.sender, 0);
    // The winner's retained share (deposit - amount) stays in the pool as
    // session proceeds.
    state.pool -= amount;
    Ok(Payout {
        to: ctx.sender,
        amount,
    })
}

/// Handle GetWinnerInfo. Available only once both reveal callbacks have
/// landed.
pub fn handle_get_winner_info(state: &AuctionLedger) -> HandlerResult<WinnerInfo> {
    if !state.winner_announced() {
        return Err(AuctionError::WinnerNotAnnounced);
    }
    Ok(WinnerInfo {
        winner: state.winner,
        amount: state.winning_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::AuctionGenesisConfig;
    use auction_fhe::{seal_uint64, MockFheEngine};
    use auction_types::CtHandle;
    use rand::rngs::OsRng;

    const ORACLE: Address = [0xee; 32];
    const ADMIN: Address = [1u8; 32];
    const ALICE: Address = [2u8; 32];
    const BOB: Address = [3u8; 32];
    const CAROL: Address = [4u8; 32];

    /// Gateway double recording every issued request.
    #[derive(Default)]
    struct TestGateway {
        next: u64,
        requests: Vec<(RequestId, Vec<CtHandle>)>,
    }

    impl TestGateway {
        fn handles(&self, id: RequestId) -> &[CtHandle] {
            &self
                .requests
                .iter()
                .find(|(rid, _)| *rid == id)
                .expect("unknown request")
                .1
        }
    }

    impl DecryptionGateway for TestGateway {
        fn request_decryption(&mut self, handles: Vec<CtHandle>) -> RequestId {
            self.next += 1;
            let id = RequestId(self.next);
            self.requests.push((id, handles));
            id
        }
    }

    struct Fixture {
        state: AuctionLedger,
        fhe: MockFheEngine,
        gateway: TestGateway,
    }

    fn setup() -> Fixture {
        let mut fhe = MockFheEngine::new();
        let genesis = AuctionGenesisConfig::new(ORACLE);
        let state = AuctionLedger::new(&genesis, &mut fhe);
        Fixture {
            state,
            fhe,
            gateway: TestGateway::default(),
        }
    }

    fn ctx_at(sender: Address, timestamp: u64) -> CallContext {
        CallContext {
            sender,
            block_height: 100,
            timestamp,
            value: 0,
        }
    }

    fn bid_ctx(sender: Address, timestamp: u64, deposit: u64) -> CallContext {
        CallContext {
            sender,
            block_height: 100,
            timestamp,
            value: deposit,
        }
    }

    fn place_bid(f: &mut Fixture, sender: Address, amount: u64, deposit: u64) {
        let sealed = seal_uint64(amount, &mut OsRng);
        handle_place_bid(
            &mut f.state,
            &mut f.fhe,
            &bid_ctx(sender, 1_100, deposit),
            &sealed.ciphertext,
            &sealed.proof,
        )
        .expect("bid failed");
    }

    /// Oracle-side helper: reveal the single handle of a request and build
    /// the proof-carrying callback values.
    fn reveal_one(f: &Fixture, id: RequestId) -> (Plaintext, [u8; 32]) {
        let handles = f.gateway.handles(id);
        let value = f.fhe.reveal(handles[0]).expect("reveal failed");
        (value, callback_digest(id, &[value]))
    }

    fn started_fixture() -> Fixture {
        let mut f = setup();
        handle_start_auction(&mut f.state, &mut f.fhe, &ctx_at(ADMIN, 1_000), 500).unwrap();
        f
    }

    /// Start, bid A:100 / B:300 / C:200, end, request decryption.
    fn requested_fixture() -> Fixture {
        let mut f = started_fixture();
        place_bid(&mut f, ALICE, 100, 150);
        place_bid(&mut f, BOB, 300, 400);
        place_bid(&mut f, CAROL, 200, 250);
        handle_end_auction(&mut f.state, &ctx_at(ADMIN, 1_600)).unwrap();
        handle_request_decryption(&mut f.state, &ctx_at(ADMIN, 1_601), &mut f.gateway).unwrap();
        f
    }

    fn deliver_bidder(f: &mut Fixture) {
        let id = f.state.pending.bidder.in_flight().unwrap();
        let (value, proof) = reveal_one(f, id);
        let bidder = value.as_address().unwrap();
        handle_callback_bidder(&mut f.state, &ctx_at(ORACLE, 1_700), id, bidder, &proof).unwrap();
    }

    fn deliver_amount(f: &mut Fixture) {
        let id = f.state.pending.amount.in_flight().unwrap();
        let (value, proof) = reveal_one(f, id);
        let amount = value.as_uint64().unwrap();
        handle_callback_amount(
            &mut f.state,
            &mut f.fhe,
            &ctx_at(ORACLE, 1_700),
            id,
            amount,
            &proof,
        )
        .unwrap();
    }

    // ---- state machine ----

    #[test]
    fn test_start_auction_assigns_admin() {
        let mut f = setup();
        handle_start_auction(&mut f.state, &mut f.fhe, &ctx_at(ADMIN, 1_000), 500).unwrap();

        assert_eq!(f.state.admin, Some(ADMIN));
        assert_eq!(f.state.phase, AuctionPhase::Started);
        assert_eq!(f.state.start_time, 1_000);
        assert_eq!(f.state.end_time, 1_500);
        assert!(f.state.highest.is_some());
        assert_eq!(
            f.state.take_events(),
            vec![AuctionEvent::AuctionStarted {
                admin: ADMIN,
                start_time: 1_000,
                end_time: 1_500,
            }]
        );
    }

    #[test]
    fn test_start_auction_second_caller_fails() {
        let mut f = started_fixture();
        let result = handle_start_auction(&mut f.state, &mut f.fhe, &ctx_at(ALICE, 1_001), 500);
        assert_eq!(result, Err(AuctionError::AlreadyStarted));
        assert_eq!(f.state.admin, Some(ADMIN));
    }

    #[test]
    fn test_start_auction_zero_duration() {
        let mut f = setup();
        let result = handle_start_auction(&mut f.state, &mut f.fhe, &ctx_at(ADMIN, 1_000), 0);
        assert_eq!(result, Err(AuctionError::InvalidDuration));
    }

    #[test]
    fn test_set_item_admin_only() {
        let mut f = started_fixture();
        handle_set_auction_item(&mut f.state, &ctx_at(ADMIN, 1_001), "lot 7".into()).unwrap();
        assert_eq!(f.state.item, "lot 7");

        let result = handle_set_auction_item(&mut f.state, &ctx_at(ALICE, 1_002), "mine".into());
        assert_eq!(result, Err(AuctionError::NotAdmin));
        assert_eq!(f.state.item, "lot 7");
    }

    #[test]
    fn test_end_auction_transitions() {
        let mut f = started_fixture();
        assert_eq!(
            handle_end_auction(&mut f.state, &ctx_at(ALICE, 1_600)),
            Err(AuctionError::NotAdmin)
        );
        handle_end_auction(&mut f.state, &ctx_at(ADMIN, 1_600)).unwrap();
        assert_eq!(f.state.phase, AuctionPhase::Ended);

        // already ended
        assert_eq!(
            handle_end_auction(&mut f.state, &ctx_at(ADMIN, 1_601)),
            Err(AuctionError::NotActive)
        );
    }

    #[test]
    fn test_reset_requires_ended() {
        let mut f = started_fixture();
        assert_eq!(
            handle_reset_auction(&mut f.state, &ctx_at(ADMIN, 1_100)),
            Err(AuctionError::NotEnded)
        );
    }

    // ---- bid engine ----

    #[test]
    fn test_place_bid_records_state() {
        let mut f = started_fixture();
        place_bid(&mut f, ALICE, 100, 150);

        assert!(f.state.has_bid(&ALICE));
        assert_eq!(f.state.deposit_of(&ALICE), 150);
        assert_eq!(f.state.bidders, vec![ALICE]);
        assert_eq!(f.state.pool, 150);
    }

    #[test]
    fn test_place_bid_outside_window() {
        let mut f = started_fixture();
        let sealed = seal_uint64(100, &mut OsRng);
        let result = handle_place_bid(
            &mut f.state,
            &mut f.fhe,
            &bid_ctx(ALICE, 2_000, 150),
            &sealed.ciphertext,
            &sealed.proof,
        );
        assert_eq!(result, Err(AuctionError::AuctionNotActive));
    }

    #[test]
    fn test_place_bid_wrong_phase() {
        let mut f = setup();
        let sealed = seal_uint64(100, &mut OsRng);
        let result = handle_place_bid(
            &mut f.state,
            &mut f.fhe,
            &bid_ctx(ALICE, 1_100, 150),
            &sealed.ciphertext,
            &sealed.proof,
        );
        assert_eq!(result, Err(AuctionError::AuctionNotActive));
    }

    #[test]
    fn test_place_bid_requires_deposit() {
        let mut f = started_fixture();
        let sealed = seal_uint64(100, &mut OsRng);
        let result = handle_place_bid(
            &mut f.state,
            &mut f.fhe,
            &bid_ctx(ALICE, 1_100, 0),
            &sealed.ciphertext,
            &sealed.proof,
        );
        assert_eq!(result, Err(AuctionError::DepositRequired));
    }

    #[test]
    fn test_place_bid_rejects_forged_input() {
        let mut f = started_fixture();
        let sealed = seal_uint64(100, &mut OsRng);
        let result = handle_place_bid(
            &mut f.state,
            &mut f.fhe,
            &bid_ctx(ALICE, 1_100, 150),
            &sealed.ciphertext,
            &[0u8; 32],
        );
        assert_eq!(result, Err(AuctionError::InvalidProof));
        assert!(!f.state.has_bid(&ALICE));
        assert_eq!(f.state.pool, 0);
    }

    #[test]
    fn test_running_maximum_tracks_highest() {
        let mut f = started_fixture();
        place_bid(&mut f, ALICE, 100, 150);
        place_bid(&mut f, BOB, 300, 400);
        place_bid(&mut f, CAROL, 200, 250);

        let highest = f.state.highest.unwrap();
        assert_eq!(f.fhe.reveal(highest.bid), Ok(Plaintext::Uint64(300)));
        assert_eq!(f.fhe.reveal(highest.bidder), Ok(Plaintext::Addr(BOB)));
    }

    #[test]
    fn test_equal_bid_keeps_first_bidder() {
        let mut f = started_fixture();
        place_bid(&mut f, ALICE, 300, 400);
        place_bid(&mut f, BOB, 300, 400);

        let highest = f.state.highest.unwrap();
        assert_eq!(f.fhe.reveal(highest.bidder), Ok(Plaintext::Addr(ALICE)));
    }

    #[test]
    fn test_repeat_bid_overwrites_and_accumulates_deposit() {
        let mut f = started_fixture();
        place_bid(&mut f, ALICE, 100, 150);
        place_bid(&mut f, ALICE, 250, 200);

        assert_eq!(f.state.deposit_of(&ALICE), 350);
        assert_eq!(f.state.bidders, vec![ALICE, ALICE]);
        let highest = f.state.highest.unwrap();
        assert_eq!(f.fhe.reveal(highest.bid), Ok(Plaintext::Uint64(250)));
        assert_eq!(
            f.fhe.reveal(*f.state.bids.get(&ALICE).unwrap()),
            Ok(Plaintext::Uint64(250))
        );
    }

    // ---- decryption-callback router ----

    #[test]
    fn test_request_decryption_arms_both_slots() {
        let f = requested_fixture();
        let bidder_id = f.state.pending.bidder.in_flight().unwrap();
        let amount_id = f.state.pending.amount.in_flight().unwrap();
        assert_ne!(bidder_id, amount_id);
        assert_eq!(f.gateway.requests.len(), 2);
    }

    #[test]
    fn test_request_decryption_duplicate_fails() {
        let mut f = requested_fixture();
        let result = handle_request_decryption(&mut f.state, &ctx_at(ADMIN, 1_700), &mut f.gateway);
        assert_eq!(result, Err(AuctionError::AlreadyRequested));
    }

    #[test]
    fn test_request_decryption_requires_ended() {
        let mut f = started_fixture();
        let result = handle_request_decryption(&mut f.state, &ctx_at(ADMIN, 1_100), &mut f.gateway);
        assert_eq!(result, Err(AuctionError::NotEnded));
    }

    #[test]
    fn test_request_decryption_blocked_after_reveal() {
        let mut f = requested_fixture();
        deliver_bidder(&mut f);
        deliver_amount(&mut f);
        // slots are consumed, not re-armable, until reset
        let result = handle_request_decryption(&mut f.state, &ctx_at(ADMIN, 1_800), &mut f.gateway);
        assert_eq!(result, Err(AuctionError::AlreadyRequested));
    }

    #[test]
    fn test_reveal_bidder_then_amount() {
        let mut f = requested_fixture();
        deliver_bidder(&mut f);
        assert_eq!(f.state.winner, BOB);
        assert!(!f.state.winner_announced());

        deliver_amount(&mut f);
        assert_eq!(f.state.winning_amount, 300);
        assert!(f.state.winner_announced());

        let events = f.state.take_events();
        let announced: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, AuctionEvent::WinnerAnnounced { .. }))
            .collect();
        assert_eq!(announced.len(), 1);
        assert_eq!(
            announced[0],
            &AuctionEvent::WinnerAnnounced {
                winner: BOB,
                amount: 300
            }
        );
    }

    #[test]
    fn test_reveal_amount_then_bidder() {
        let mut f = requested_fixture();
        deliver_amount(&mut f);
        assert_eq!(f.state.winning_amount, 300);
        assert!(!f.state.winner_announced());

        deliver_bidder(&mut f);
        assert!(f.state.winner_announced());

        let events = f.state.take_events();
        let announced: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, AuctionEvent::WinnerAnnounced { .. }))
            .collect();
        assert_eq!(announced.len(), 1);
    }

    #[test]
    fn test_callback_requires_oracle_identity() {
        let mut f = requested_fixture();
        let id = f.state.pending.bidder.in_flight().unwrap();
        let (value, proof) = reveal_one(&f, id);
        let bidder = value.as_address().unwrap();
        let result =
            handle_callback_bidder(&mut f.state, &ctx_at(ADMIN, 1_700), id, bidder, &proof);
        assert_eq!(result, Err(AuctionError::NotOracle));
        assert_eq!(f.state.winner, ZERO_ADDRESS);
    }

    #[test]
    fn test_callback_rejects_stale_request_id() {
        let mut f = requested_fixture();
        let id = f.state.pending.bidder.in_flight().unwrap();
        let stale = RequestId(id.0 + 100);
        let proof = callback_digest(stale, &[Plaintext::Addr(BOB)]);
        let result =
            handle_callback_bidder(&mut f.state, &ctx_at(ORACLE, 1_700), stale, BOB, &proof);
        assert_eq!(result, Err(AuctionError::InvalidRequestId(stale.0)));
        assert_eq!(f.state.winner, ZERO_ADDRESS);
        // the correct callback still succeeds afterwards
        deliver_bidder(&mut f);
        assert_eq!(f.state.winner, BOB);
    }

    #[test]
    fn test_callback_rejects_forged_proof() {
        let mut f = requested_fixture();
        let id = f.state.pending.amount.in_flight().unwrap();
        let forged = callback_digest(id, &[Plaintext::Uint64(1)]);
        let result = handle_callback_amount(
            &mut f.state,
            &mut f.fhe,
            &ctx_at(ORACLE, 1_700),
            id,
            300,
            &forged,
        );
        assert_eq!(result, Err(AuctionError::InvalidProof));
        assert_eq!(f.state.winning_amount, 0);
        deliver_amount(&mut f);
        assert_eq!(f.state.winning_amount, 300);
    }

    #[test]
    fn test_callback_replay_rejected() {
        let mut f = requested_fixture();
        let id = f.state.pending.bidder.in_flight().unwrap();
        let (value, proof) = reveal_one(&f, id);
        let bidder = value.as_address().unwrap();
        handle_callback_bidder(&mut f.state, &ctx_at(ORACLE, 1_700), id, bidder, &proof).unwrap();

        let replay = handle_callback_bidder(&mut f.state, &ctx_at(ORACLE, 1_701), id, bidder, &proof);
        assert_eq!(replay, Err(AuctionError::InvalidRequestId(id.0)));
    }

    #[test]
    fn test_amount_callback_accumulates_total() {
        let mut f = requested_fixture();
        deliver_amount(&mut f);
        assert_eq!(
            f.fhe.reveal(f.state.total_winning_amount),
            Ok(Plaintext::Uint64(300))
        );
        assert!(!f.state.withdraw_lock);
    }

    // ---- withdrawal ----

    fn revealed_fixture() -> Fixture {
        let mut f = requested_fixture();
        deliver_bidder(&mut f);
        deliver_amount(&mut f);
        f
    }

    fn deliver_total(f: &mut Fixture) -> Payout {
        let pending = f.state.pending.total.unwrap();
        let id = pending.request_id;
        let (value, proof) = reveal_one(f, id);
        let total = value.as_uint64().unwrap();
        handle_callback_total_amount(
            &mut f.state,
            &mut f.fhe,
            &ctx_at(ORACLE, 1_900),
            id,
            total,
            &proof,
        )
        .unwrap()
    }

    #[test]
    fn test_withdraw_total_proceeds_flow() {
        let mut f = revealed_fixture();
        handle_withdraw_total_proceeds(&mut f.state, &ctx_at(ADMIN, 1_800), &mut f.gateway)
            .unwrap();
        let payout = deliver_total(&mut f);

        assert_eq!(payout, Payout { to: ADMIN, amount: 300 });
        assert_eq!(f.state.decrypted_total, 300);
        assert!(f.state.withdraw_lock);
        assert_eq!(f.state.pending.total, None);
        assert_eq!(
            f.fhe.reveal(f.state.total_winning_amount),
            Ok(Plaintext::Uint64(0))
        );
        assert!(f
            .state
            .take_events()
            .contains(&AuctionEvent::ProceedsWithdrawn {
                admin: ADMIN,
                amount: 300
            }));
    }

    #[test]
    fn test_withdraw_twice_before_callback_fails() {
        let mut f = revealed_fixture();
        handle_withdraw_total_proceeds(&mut f.state, &ctx_at(ADMIN, 1_800), &mut f.gateway)
            .unwrap();
        let result =
            handle_withdraw_total_proceeds(&mut f.state, &ctx_at(ADMIN, 1_801), &mut f.gateway);
        assert_eq!(result, Err(AuctionError::WithdrawalPending));
    }

    #[test]
    fn test_withdraw_locked_after_callback() {
        let mut f = revealed_fixture();
        handle_withdraw_total_proceeds(&mut f.state, &ctx_at(ADMIN, 1_800), &mut f.gateway)
            .unwrap();
        deliver_total(&mut f);

        let result =
            handle_withdraw_total_proceeds(&mut f.state, &ctx_at(ADMIN, 1_900), &mut f.gateway);
        assert_eq!(result, Err(AuctionError::WithdrawalPending));
    }

    // ---- settlement ----

    #[test]
    fn test_refund_before_reveal_fails() {
        let mut f = requested_fixture();
        let result = handle_refund(&mut f.state, &ctx_at(ALICE, 1_800));
        assert_eq!(result, Err(AuctionError::WinnerNotAnnounced));
    }

    #[test]
    fn test_refund_loser_full_deposit() {
        let mut f = revealed_fixture();
        let payout = handle_refund(&mut f.state, &ctx_at(ALICE, 1_800)).unwrap();
        assert_eq!(payout, Payout { to: ALICE, amount: 150 });
        assert_eq!(f.state.deposit_of(&ALICE), 0);
    }

    #[test]
    fn test_refund_winner_net_of_amount() {
        let mut f = revealed_fixture();
        let payout = handle_refund(&mut f.state, &ctx_at(BOB, 1_800)).unwrap();
        assert_eq!(payout, Payout { to: BOB, amount: 100 });
        assert_eq!(f.state.deposit_of(&BOB), 0);
    }

    #[test]
    fn test_refund_twice_fails() {
        let mut f = revealed_fixture();
        handle_refund(&mut f.state, &ctx_at(CAROL, 1_800)).unwrap();
        let result = handle_refund(&mut f.state, &ctx_at(CAROL, 1_801));
        assert_eq!(result, Err(AuctionError::NoDeposit));
    }

    #[test]
    fn test_refund_non_bidder_fails() {
        let mut f = revealed_fixture();
        let result = handle_refund(&mut f.state, &ctx_at([9u8; 32], 1_800));
        assert_eq!(result, Err(AuctionError::NoDeposit));
    }

    #[test]
    fn test_refund_pool_retains_proceeds() {
        let mut f = revealed_fixture();
        let total_deposits = 150 + 400 + 250;
        assert_eq!(f.state.pool, total_deposits);

        handle_refund(&mut f.state, &ctx_at(ALICE, 1_800)).unwrap();
        handle_refund(&mut f.state, &ctx_at(BOB, 1_801)).unwrap();
        handle_refund(&mut f.state, &ctx_at(CAROL, 1_802)).unwrap();

        // only the winning amount remains, owed to the admin on withdrawal
        assert_eq!(f.state.pool, 300);
    }

    #[test]
    fn test_refund_winner_underfunded_deposit() {
        let mut f = started_fixture();
        // bids above deposit are possible: the deposit bound is a client
        // convention, not a contract rule
        place_bid(&mut f, ALICE, 500, 200);
        handle_end_auction(&mut f.state, &ctx_at(ADMIN, 1_600)).unwrap();
        handle_request_decryption(&mut f.state, &ctx_at(ADMIN, 1_601), &mut f.gateway).unwrap();
        deliver_bidder(&mut f);
        deliver_amount(&mut f);

        let result = handle_refund(&mut f.state, &ctx_at(ALICE, 1_800));
        assert_eq!(
            result,
            Err(AuctionError::InsufficientValue {
                required: 500,
                available: 200
            })
        );
        // the failed call must not have consumed the deposit
        assert_eq!(f.state.deposit_of(&ALICE), 200);
    }

    #[test]
    fn test_get_winner_info() {
        let mut f = requested_fixture();
        assert_eq!(
            handle_get_winner_info(&f.state),
            Err(AuctionError::WinnerNotAnnounced)
        );
        deliver_bidder(&mut f);
        deliver_amount(&mut f);
        assert_eq!(
            handle_get_winner_info(&f.state),
            Ok(WinnerInfo {
                winner: BOB,
                amount: 300
            })
        );
    }

    // ---- reset / reuse ----

    #[test]
    fn test_reset_and_second_session() {
        let mut f = revealed_fixture();
        handle_refund(&mut f.state, &ctx_at(ALICE, 1_800)).unwrap();
        handle_refund(&mut f.state, &ctx_at(BOB, 1_801)).unwrap();
        handle_refund(&mut f.state, &ctx_at(CAROL, 1_802)).unwrap();
        handle_reset_auction(&mut f.state, &ctx_at(ADMIN, 1_900)).unwrap();

        assert_eq!(f.state.phase, AuctionPhase::Idle);
        assert_eq!(f.state.admin, None);

        // a different identity takes over the next session
        handle_start_auction(&mut f.state, &mut f.fhe, &ctx_at(ALICE, 2_000), 500).unwrap();
        assert_eq!(f.state.admin, Some(ALICE));

        place_bid_at(&mut f, BOB, 80, 120, 2_100);
        handle_end_auction(&mut f.state, &ctx_at(ALICE, 2_600)).unwrap();
        handle_request_decryption(&mut f.state, &ctx_at(ALICE, 2_601), &mut f.gateway).unwrap();
        deliver_bidder(&mut f);
        deliver_amount(&mut f);

        assert_eq!(f.state.winner, BOB);
        assert_eq!(f.state.winning_amount, 80);
        // the accumulator carries both sessions
        assert_eq!(
            f.fhe.reveal(f.state.total_winning_amount),
            Ok(Plaintext::Uint64(380))
        );
    }

    fn place_bid_at(f: &mut Fixture, sender: Address, amount: u64, deposit: u64, timestamp: u64) {
        let sealed = seal_uint64(amount, &mut OsRng);
        handle_place_bid(
            &mut f.state,
            &mut f.fhe,
            &bid_ctx(sender, timestamp, deposit),
            &sealed.ciphertext,
            &sealed.proof,
        )
        .expect("bid failed");
    }

    #[test]
    fn test_stale_callback_after_reset_rejected() {
        let mut f = requested_fixture();
        let id = f.state.pending.bidder.in_flight().unwrap();
        let (value, proof) = reveal_one(&f, id);
        let bidder = value.as_address().unwrap();

        handle_reset_auction(&mut f.state, &ctx_at(ADMIN, 1_800)).unwrap();

        let result =
            handle_callback_bidder(&mut f.state, &ctx_at(ORACLE, 1_900), id, bidder, &proof);
        assert_eq!(result, Err(AuctionError::InvalidRequestId(id.0)));
        assert_eq!(f.state.winner, ZERO_ADDRESS);
    }
}
