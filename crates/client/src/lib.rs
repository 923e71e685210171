//! Client SDK for the confidential sealed-bid auction.
//!
//! This crate provides a high-level API for:
//! - Sealing bid amounts for encrypted submission
//! - Querying auction state over the mock chain RPC

pub mod bid;
pub mod query;

pub use bid::{encrypt_bid, SealedBid};
