//! Auction module error types.

use auction_fhe::FheError;
use thiserror::Error;

/// Errors that can occur in the auction module.
///
/// Every failure is synchronous and all-or-nothing: a handler that returns
/// an error has not mutated the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Caller is not the auction admin")]
    NotAdmin,

    #[error("Caller is not the decryption oracle")]
    NotOracle,

    #[error("Auction already started")]
    AlreadyStarted,

    #[error("Auction duration must be greater than zero")]
    InvalidDuration,

    #[error("No auction is active")]
    NotActive,

    #[error("Auction is not accepting bids")]
    AuctionNotActive,

    #[error("A deposit is required to bid")]
    DepositRequired,

    #[error("Auction has not ended")]
    NotEnded,

    #[error("Decryption already requested")]
    AlreadyRequested,

    #[error("A withdrawal is already pending")]
    WithdrawalPending,

    #[error("Unknown or stale decryption request id: {0}")]
    InvalidRequestId(u64),

    #[error("Invalid proof")]
    InvalidProof,

    #[error("Winner not announced yet")]
    WinnerNotAnnounced,

    #[error("No deposit to refund")]
    NoDeposit,

    #[error("Insufficient funds: need {required}, have {available}")]
    InsufficientValue { required: u64, available: u64 },

    #[error(transparent)]
    Fhe(#[from] FheError),
}
