//! Confidential sealed-bid auction module.
//!
//! This module implements the auction state machine and its
//! decryption-callback protocol:
//!
//! - Open-admin lifecycle: the first starter of a session becomes admin
//! - Encrypted bid ingestion with a running homomorphic maximum
//! - Two-phase reveal of winner identity and winning amount through an
//!   asynchronous, proof-carrying decryption oracle
//! - Encrypted accumulation and on-demand reveal of aggregate proceeds
//! - Refund and withdrawal settlement over revealed plaintext
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `queries`: Read-only state access
//! - `state`: The auction ledger
//! - `events`: Observable notifications
//! - `genesis`: Deployment configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use auction_module::{handlers, state::AuctionLedger};
//!
//! let mut ledger = AuctionLedger::new(&genesis, &mut fhe);
//! handlers::handle_start_auction(&mut ledger, &mut fhe, &ctx, 3600)?;
//! handlers::handle_place_bid(&mut ledger, &mut fhe, &bid_ctx, &ct, &proof)?;
//! ```

pub mod call;
pub mod error;
pub mod events;
pub mod genesis;
pub mod handlers;
pub mod queries;
pub mod state;

pub use call::{AuctionCall, CallOutcome};
pub use error::AuctionError;
pub use events::AuctionEvent;
pub use genesis::AuctionGenesisConfig;
pub use handlers::{CallContext, HandlerResult, Payout};
pub use queries::{AuctionQuery, AuctionQueryResponse};
pub use state::AuctionLedger;
