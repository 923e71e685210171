//! Query handlers for the auction module.
//!
//! These functions provide read-only access to the ledger; they mirror
//! every plaintext field an external observer is entitled to see.

use auction_types::{Address, WinnerInfo};
use serde::{Deserialize, Serialize};

use crate::state::AuctionLedger;

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Get the current session admin (unset while idle).
    GetAdmin,

    /// Get the item description.
    GetItem,

    /// Get the bidding window.
    GetTiming,

    /// Get the lifecycle flags.
    GetPhase,

    /// Get the deposit held for an identity.
    GetDeposit { address: Address },

    /// Whether an identity has a tracked encrypted bid this session.
    HasBid { address: Address },

    /// Get the revealed winner and amount, if both callbacks have landed.
    GetWinnerInfo,

    /// Get the aggregate revealed by the latest withdrawal.
    GetDecryptedTotal,

    /// Get the value currently held by the auction.
    GetPool,
}

/// Query response types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    Admin(Option<Address>),

    Item(String),

    Timing { start_time: u64, end_time: u64 },

    Phase {
        auction_started: bool,
        auction_ended: bool,
    },

    Deposit(u64),

    HasBid(bool),

    /// `None` until both reveal callbacks have landed.
    WinnerInfo(Option<WinnerInfo>),

    DecryptedTotal(u64),

    Pool(u64),
}

/// Handle a query.
pub fn handle_query(state: &AuctionLedger, query: AuctionQuery) -> AuctionQueryResponse {
    match query {
        AuctionQuery::GetAdmin => AuctionQueryResponse::Admin(state.admin),

        AuctionQuery::GetItem => AuctionQueryResponse::Item(state.item.clone()),

        AuctionQuery::GetTiming => AuctionQueryResponse::Timing {
            start_time: state.start_time,
            end_time: state.end_time,
        },

        AuctionQuery::GetPhase => AuctionQueryResponse::Phase {
            auction_started: state.phase.auction_started(),
            auction_ended: state.phase.auction_ended(),
        },

        AuctionQuery::GetDeposit { address } => {
            AuctionQueryResponse::Deposit(state.deposit_of(&address))
        }

        AuctionQuery::HasBid { address } => AuctionQueryResponse::HasBid(state.has_bid(&address)),

        AuctionQuery::GetWinnerInfo => {
            let info = if state.winner_announced() {
                Some(WinnerInfo {
                    winner: state.winner,
                    amount: state.winning_amount,
                })
            } else {
                None
            };
            AuctionQueryResponse::WinnerInfo(info)
        }

        AuctionQuery::GetDecryptedTotal => {
            AuctionQueryResponse::DecryptedTotal(state.decrypted_total)
        }

        AuctionQuery::GetPool => AuctionQueryResponse::Pool(state.pool),
    }
}
