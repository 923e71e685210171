//! Observable auction notifications.

use auction_types::Address;
use serde::{Deserialize, Serialize};

/// Notifications emitted by the auction and drained by the embedder.
///
/// `WinnerAnnounced` is emitted exactly once per session, by whichever of
/// the two reveal callbacks completes the pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionEvent {
    AuctionStarted {
        admin: Address,
        start_time: u64,
        end_time: u64,
    },
    WinnerAnnounced {
        winner: Address,
        amount: u64,
    },
    ProceedsWithdrawn {
        admin: Address,
        amount: u64,
    },
}
