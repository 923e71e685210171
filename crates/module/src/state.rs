//! The auction ledger.

use std::collections::HashMap;

use auction_fhe::FheEngine;
use auction_types::{Address, AuctionPhase, CtHandle, Plaintext, RequestId, ZERO_ADDRESS};

use crate::events::AuctionEvent;
use crate::genesis::AuctionGenesisConfig;

/// Encrypted running maximum: the current best bid and its owner.
///
/// Both halves are always replaced together from the same encrypted
/// selector, so they never diverge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptedMaximum {
    pub bid: CtHandle,
    pub bidder: CtHandle,
}

/// Pending total-proceeds withdrawal: the request id plus the admin the
/// decrypted amount will be paid to, captured at request time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingWithdrawal {
    pub request_id: RequestId,
    pub recipient: Address,
}

/// Lifecycle of a session-scoped reveal request.
///
/// A slot is consumed exactly once: it cannot be re-armed while in flight
/// or after its callback has landed; only a session reset returns it to
/// `Unarmed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RevealSlot {
    #[default]
    Unarmed,
    InFlight(RequestId),
    Done(RequestId),
}

impl RevealSlot {
    pub fn is_unarmed(&self) -> bool {
        matches!(self, RevealSlot::Unarmed)
    }

    /// The outstanding request id, if one is in flight.
    pub fn in_flight(&self) -> Option<RequestId> {
        match self {
            RevealSlot::InFlight(id) => Some(*id),
            _ => None,
        }
    }
}

/// At most one outstanding oracle request per logical kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct PendingRequests {
    pub bidder: RevealSlot,
    pub amount: RevealSlot,
    pub total: Option<PendingWithdrawal>,
}

/// The authoritative auction state.
///
/// A single instance per deployment, owned by the embedder and passed
/// `&mut` to every handler. Session-scoped fields are cleared by
/// `reset_auction`; the proceeds accumulators survive across sessions.
#[derive(Debug)]
pub struct AuctionLedger {
    /// Unset until the first `start_auction` of a session; its caller
    /// becomes admin. Cleared on reset.
    pub admin: Option<Address>,
    /// Descriptive item text, settable by the admin.
    pub item: String,
    pub start_time: u64,
    pub end_time: u64,
    pub phase: AuctionPhase,

    /// Latest encrypted bid per identity (overwritten on repeat bids).
    pub bids: HashMap<Address, CtHandle>,
    /// Plaintext deposit total per identity (accumulated across bids).
    pub deposits: HashMap<Address, u64>,
    /// Identities that bid this session, in order. Duplicates are
    /// tolerated; the reset clearing loop is idempotent per identity.
    pub bidders: Vec<Address>,
    /// Encrypted running maximum, armed by `start_auction`.
    pub highest: Option<EncryptedMaximum>,

    /// Revealed winner identity; zero until the bidder callback lands.
    pub winner: Address,
    /// Revealed winning amount; zero until the amount callback lands.
    pub winning_amount: u64,

    /// Encrypted all-time accumulator of winning amounts.
    pub total_winning_amount: CtHandle,
    /// Plaintext aggregate revealed by the latest withdrawal.
    pub decrypted_total: u64,

    pub pending: PendingRequests,
    /// Set once proceeds are withdrawn; cleared when the next session's
    /// winning amount lands.
    pub withdraw_lock: bool,

    /// Value currently held by the auction (un-refunded deposits).
    pub pool: u64,

    /// Only this identity may invoke the decryption callbacks.
    pub oracle_authority: Address,

    events: Vec<AuctionEvent>,
}

impl AuctionLedger {
    /// Create the ledger at deployment, with the proceeds accumulator
    /// armed as an encryption of zero.
    pub fn new(genesis: &AuctionGenesisConfig, fhe: &mut impl FheEngine) -> Self {
        Self {
            admin: None,
            item: genesis.initial_item.clone().unwrap_or_default(),
            start_time: 0,
            end_time: 0,
            phase: AuctionPhase::Idle,
            bids: HashMap::new(),
            deposits: HashMap::new(),
            bidders: Vec::new(),
            highest: None,
            winner: ZERO_ADDRESS,
            winning_amount: 0,
            total_winning_amount: fhe.encrypt(Plaintext::Uint64(0)),
            decrypted_total: 0,
            pending: PendingRequests::default(),
            withdraw_lock: false,
            pool: 0,
            oracle_authority: genesis.oracle_authority,
            events: Vec::new(),
        }
    }

    /// Deposit held for an identity.
    pub fn deposit_of(&self, address: &Address) -> u64 {
        self.deposits.get(address).copied().unwrap_or(0)
    }

    /// Whether an identity has an encrypted bid tracked this session.
    pub fn has_bid(&self, address: &Address) -> bool {
        self.bids.contains_key(address)
    }

    /// Whether both halves of the reveal have landed.
    pub fn winner_announced(&self) -> bool {
        self.winner != ZERO_ADDRESS && self.winning_amount != 0
    }

    /// Clear session-scoped state and return to `Idle`.
    ///
    /// Deposits and the pool survive: un-refunded bidders keep their
    /// claim. The proceeds accumulators and the withdraw lock also
    /// survive, as does an outstanding total-withdrawal request.
    pub fn clear_session(&mut self) {
        for bidder in self.bidders.drain(..) {
            self.bids.remove(&bidder);
        }
        self.item.clear();
        self.start_time = 0;
        self.end_time = 0;
        self.highest = None;
        self.winner = ZERO_ADDRESS;
        self.winning_amount = 0;
        self.pending.bidder = RevealSlot::Unarmed;
        self.pending.amount = RevealSlot::Unarmed;
        self.admin = None;
        self.phase = AuctionPhase::Idle;
    }

    pub(crate) fn emit(&mut self, event: AuctionEvent) {
        self.events.push(event);
    }

    /// Drain the notifications emitted since the last call.
    pub fn take_events(&mut self) -> Vec<AuctionEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_fhe::MockFheEngine;

    fn test_ledger() -> (AuctionLedger, MockFheEngine) {
        let mut fhe = MockFheEngine::new();
        let genesis = AuctionGenesisConfig::new([0xee; 32]);
        let ledger = AuctionLedger::new(&genesis, &mut fhe);
        (ledger, fhe)
    }

    #[test]
    fn test_new_ledger_is_idle() {
        let (ledger, fhe) = test_ledger();
        assert_eq!(ledger.phase, AuctionPhase::Idle);
        assert_eq!(ledger.admin, None);
        assert!(!ledger.winner_announced());
        // the accumulator is armed as an encryption of zero
        assert_eq!(
            fhe.reveal(ledger.total_winning_amount),
            Ok(Plaintext::Uint64(0))
        );
    }

    #[test]
    fn test_deposit_accessor() {
        let (mut ledger, _fhe) = test_ledger();
        let bidder = [1u8; 32];
        assert_eq!(ledger.deposit_of(&bidder), 0);
        ledger.deposits.insert(bidder, 500);
        assert_eq!(ledger.deposit_of(&bidder), 500);
    }

    #[test]
    fn test_clear_session_scopes() {
        let (mut ledger, mut fhe) = test_ledger();
        let bidder = [1u8; 32];

        ledger.admin = Some([9u8; 32]);
        ledger.item = "lot 7".to_string();
        ledger.start_time = 100;
        ledger.end_time = 200;
        ledger.phase = AuctionPhase::Ended;
        ledger.bids.insert(bidder, fhe.encrypt(Plaintext::Uint64(10)));
        ledger.deposits.insert(bidder, 50);
        // duplicate entries are fine, clearing is idempotent per identity
        ledger.bidders.push(bidder);
        ledger.bidders.push(bidder);
        ledger.winner = bidder;
        ledger.winning_amount = 10;
        ledger.pending.bidder = RevealSlot::InFlight(RequestId(1));
        ledger.pending.amount = RevealSlot::Done(RequestId(2));
        ledger.decrypted_total = 77;
        ledger.withdraw_lock = true;
        ledger.pool = 50;

        ledger.clear_session();

        assert_eq!(ledger.phase, AuctionPhase::Idle);
        assert_eq!(ledger.admin, None);
        assert!(ledger.item.is_empty());
        assert!(ledger.bids.is_empty());
        assert!(ledger.bidders.is_empty());
        assert_eq!(ledger.highest, None);
        assert_eq!(ledger.winner, ZERO_ADDRESS);
        assert_eq!(ledger.winning_amount, 0);
        assert!(ledger.pending.bidder.is_unarmed());
        assert!(ledger.pending.amount.is_unarmed());

        // cross-session state survives
        assert_eq!(ledger.deposit_of(&bidder), 50);
        assert_eq!(ledger.pool, 50);
        assert_eq!(ledger.decrypted_total, 77);
        assert!(ledger.withdraw_lock);
    }

    #[test]
    fn test_take_events_drains() {
        let (mut ledger, _fhe) = test_ledger();
        ledger.emit(AuctionEvent::WinnerAnnounced {
            winner: [2u8; 32],
            amount: 300,
        });
        assert_eq!(ledger.take_events().len(), 1);
        assert!(ledger.take_events().is_empty());
    }
}
