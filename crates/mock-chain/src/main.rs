//! Mock chain server for local testing of the confidential auction.
//!
//! This provides a JSON-RPC server that simulates serialized on-chain
//! execution — every call runs to completion under one lock — plus a
//! built-in decryption oracle that only delivers callbacks when pumped,
//! so callback orderings can be exercised deliberately.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use tracing::info;

use auction_fhe::MockFheEngine;
use auction_module::{
    handlers, queries::handle_query, AuctionError, AuctionGenesisConfig, AuctionLedger,
    AuctionQuery, AuctionQueryResponse, CallContext,
};
use auction_oracle::{DecryptionOracle, OracleError};
use auction_types::{Address, OracleCallback, RequestId};

mod types;
use types::*;

/// Oracle identity used when genesis does not name one.
const DEFAULT_ORACLE_AUTHORITY: Address = [0xee; 32];

/// Shared chain state.
struct ChainState {
    ledger: AuctionLedger,
    fhe: MockFheEngine,
    oracle: DecryptionOracle,
    /// Native account balances (seeded via `admin_fund`).
    balances: HashMap<Address, u64>,
    /// Current block height (simulated)
    block_height: u64,
    /// Current timestamp (simulated, can be advanced)
    timestamp: u64,
}

impl ChainState {
    fn new(genesis: &AuctionGenesisConfig, initial_timestamp: u64) -> Self {
        let mut fhe = MockFheEngine::new();
        let ledger = AuctionLedger::new(genesis, &mut fhe);
        Self {
            ledger,
            fhe,
            oracle: DecryptionOracle::new(),
            balances: HashMap::new(),
            block_height: 0,
            timestamp: initial_timestamp,
        }
    }

    fn advance_block(&mut self) {
        self.block_height += 1;
        self.timestamp += 12; // ~12 second blocks
    }

    fn call_ctx(&self, sender: Address, value: u64) -> CallContext {
        CallContext {
            sender,
            block_height: self.block_height,
            timestamp: self.timestamp,
            value,
        }
    }

    fn credit(&mut self, address: Address, amount: u64) {
        *self.balances.entry(address).or_insert(0) += amount;
    }

    fn balance_of(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Route a delivered oracle callback to the matching module handler.
    fn apply_callback(&mut self, callback: OracleCallback) -> Result<CallbackRpc, ErrorObjectOwned> {
        let ctx = self.call_ctx(self.ledger.oracle_authority, 0);
        let id = callback.request_id;

        if self.ledger.pending.bidder.in_flight() == Some(id) {
            let bidder = callback
                .values
                .first()
                .and_then(|v| v.as_address())
                .ok_or_else(|| invalid_params("bidder reveal did not decode to an address"))?;
            handlers::handle_callback_bidder(&mut self.ledger, &ctx, id, bidder, &callback.proof)
                .map_err(auction_err)?;
            return Ok(CallbackRpc {
                request_id: id.0,
                kind: "bidder".to_string(),
            });
        }

        if self.ledger.pending.amount.in_flight() == Some(id) {
            let amount = callback
                .values
                .first()
                .and_then(|v| v.as_uint64())
                .ok_or_else(|| invalid_params("amount reveal did not decode to a uint64"))?;
            handlers::handle_callback_amount(
                &mut self.ledger,
                &mut self.fhe,
                &ctx,
                id,
                amount,
                &callback.proof,
            )
            .map_err(auction_err)?;
            return Ok(CallbackRpc {
                request_id: id.0,
                kind: "amount".to_string(),
            });
        }

        if self.ledger.pending.total.map(|p| p.request_id) == Some(id) {
            let total = callback
                .values
                .first()
                .and_then(|v| v.as_uint64())
                .ok_or_else(|| invalid_params("total reveal did not decode to a uint64"))?;
            let payout = handlers::handle_callback_total_amount(
                &mut self.ledger,
                &mut self.fhe,
                &ctx,
                id,
                total,
                &callback.proof,
            )
            .map_err(auction_err)?;
            self.credit(payout.to, payout.amount);
            return Ok(CallbackRpc {
                request_id: id.0,
                kind: "total".to_string(),
            });
        }

        Err(invalid_params(format!(
            "request id {id} matches no armed reveal"
        )))
    }
}

fn auction_err(e: AuctionError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32000, e.to_string(), None::<()>)
}

fn oracle_err(e: OracleError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32001, e.to_string(), None::<()>)
}

fn invalid_params(msg: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32602, msg.into(), None::<()>)
}

fn parse_sender(s: &str) -> Result<Address, ErrorObjectOwned> {
    parse_address(s).map_err(invalid_params)
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Re-initialize the chain with genesis config.
    #[method(name = "admin_init")]
    async fn admin_init(&self, config: GenesisConfigRpc) -> Result<bool, ErrorObjectOwned>;

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned>;

    /// Seed an account balance.
    #[method(name = "admin_fund")]
    async fn admin_fund(&self, params: FundParams) -> Result<u64, ErrorObjectOwned>;

    // ============ Oracle Methods ============

    /// Ids of decryption requests awaiting delivery.
    #[method(name = "oracle_pending")]
    async fn oracle_pending(&self) -> Result<Vec<u64>, ErrorObjectOwned>;

    /// Deliver one pending callback, in any order.
    #[method(name = "oracle_deliver")]
    async fn oracle_deliver(&self, request_id: u64) -> Result<CallbackRpc, ErrorObjectOwned>;

    /// Deliver every pending callback in arrival order.
    #[method(name = "oracle_deliverAll")]
    async fn oracle_deliver_all(&self) -> Result<Vec<CallbackRpc>, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// Start a session; the sender becomes admin.
    #[method(name = "auction_start")]
    async fn auction_start(&self, params: StartAuctionParams) -> Result<bool, ErrorObjectOwned>;

    /// Set the item description.
    #[method(name = "auction_setItem")]
    async fn auction_set_item(&self, params: SetItemParams) -> Result<bool, ErrorObjectOwned>;

    /// Submit a sealed bid with a deposit.
    #[method(name = "auction_bid")]
    async fn auction_bid(&self, params: PlaceBidParams) -> Result<bool, ErrorObjectOwned>;

    /// Close bidding.
    #[method(name = "auction_end")]
    async fn auction_end(&self, params: SenderParams) -> Result<bool, ErrorObjectOwned>;

    /// Fire the winner reveal requests.
    #[method(name = "auction_requestDecryption")]
    async fn auction_request_decryption(
        &self,
        params: SenderParams,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Claim the sender's refund; returns the paid amount.
    #[method(name = "auction_refund")]
    async fn auction_refund(&self, params: SenderParams) -> Result<u64, ErrorObjectOwned>;

    /// Request reveal-and-withdrawal of the accumulated proceeds.
    #[method(name = "auction_withdraw")]
    async fn auction_withdraw(&self, params: SenderParams) -> Result<bool, ErrorObjectOwned>;

    /// Reset the session.
    #[method(name = "auction_reset")]
    async fn auction_reset(&self, params: SenderParams) -> Result<bool, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Snapshot of the plaintext ledger fields.
    #[method(name = "query_getAuction")]
    async fn query_get_auction(&self) -> Result<AuctionInfoRpc, ErrorObjectOwned>;

    /// Deposit held for an identity.
    #[method(name = "query_getDeposit")]
    async fn query_get_deposit(&self, address: String) -> Result<u64, ErrorObjectOwned>;

    /// Revealed winner info, absent until both callbacks land.
    #[method(name = "query_getWinner")]
    async fn query_get_winner(&self) -> Result<Option<WinnerInfoRpc>, ErrorObjectOwned>;

    /// Aggregate revealed by the latest withdrawal.
    #[method(name = "query_getDecryptedTotal")]
    async fn query_get_decrypted_total(&self) -> Result<u64, ErrorObjectOwned>;

    /// Native balance of an identity.
    #[method(name = "query_getBalance")]
    async fn query_get_balance(&self, address: String) -> Result<u64, ErrorObjectOwned>;

    /// Drain the notifications emitted since the last call.
    #[method(name = "query_takeEvents")]
    async fn query_take_events(&self) -> Result<Vec<EventRpc>, ErrorObjectOwned>;
}

/// The RPC server implementation.
struct MockChainRpc {
    state: Arc<RwLock<ChainState>>,
}

impl MockChainRpc {
    fn new() -> Self {
        let genesis = AuctionGenesisConfig::new(DEFAULT_ORACLE_AUTHORITY);
        Self {
            state: Arc::new(RwLock::new(ChainState::new(&genesis, 0))),
        }
    }
}

#[async_trait]
impl MockChainApiServer for MockChainRpc {
    async fn admin_init(&self, config: GenesisConfigRpc) -> Result<bool, ErrorObjectOwned> {
        let oracle_authority = match &config.oracle_authority {
            Some(s) => parse_sender(s)?,
            None => DEFAULT_ORACLE_AUTHORITY,
        };
        let mut genesis = AuctionGenesisConfig::new(oracle_authority);
        genesis.initial_item = config.initial_item.clone();
        genesis
            .validate()
            .map_err(|e| invalid_params(e.to_string()))?;

        let mut guard = self.state.write();
        *guard = ChainState::new(&genesis, config.initial_timestamp.unwrap_or(0));
        info!("Chain re-initialized");
        Ok(true)
    }

    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut guard = self.state.write();
        guard.advance_block();
        Ok(BlockInfo {
            height: guard.block_height,
            timestamp: guard.timestamp,
        })
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned> {
        self.state.write().timestamp = timestamp;
        Ok(true)
    }

    async fn admin_fund(&self, params: FundParams) -> Result<u64, ErrorObjectOwned> {
        let address = parse_sender(&params.address)?;
        let mut guard = self.state.write();
        guard.credit(address, params.amount);
        Ok(guard.balance_of(&address))
    }

    async fn oracle_pending(&self) -> Result<Vec<u64>, ErrorObjectOwned> {
        let guard = self.state.read();
        Ok(guard
            .oracle
            .pending_requests()
            .into_iter()
            .map(|id| id.0)
            .collect())
    }

    async fn oracle_deliver(&self, request_id: u64) -> Result<CallbackRpc, ErrorObjectOwned> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let callback = state
            .oracle
            .deliver(&state.fhe, RequestId(request_id))
            .map_err(oracle_err)?;
        state.apply_callback(callback)
    }

    async fn oracle_deliver_all(&self) -> Result<Vec<CallbackRpc>, ErrorObjectOwned> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let callbacks = state.oracle.deliver_all(&state.fhe).map_err(oracle_err)?;
        let mut applied = Vec::with_capacity(callbacks.len());
        for callback in callbacks {
            applied.push(state.apply_callback(callback)?);
        }
        Ok(applied)
    }

    async fn auction_start(&self, params: StartAuctionParams) -> Result<bool, ErrorObjectOwned> {
        let sender = parse_sender(&params.sender)?;
        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = state.call_ctx(sender, 0);
        handlers::handle_start_auction(&mut state.ledger, &mut state.fhe, &ctx, params.duration)
            .map_err(auction_err)?;
        info!(admin = %hex::encode(sender), duration = params.duration, "Auction started");
        Ok(true)
    }

    async fn auction_set_item(&self, params: SetItemParams) -> Result<bool, ErrorObjectOwned> {
        let sender = parse_sender(&params.sender)?;
        let mut guard = self.state.write();
        let ctx = guard.call_ctx(sender, 0);
        handlers::handle_set_auction_item(&mut guard.ledger, &ctx, params.item)
            .map_err(auction_err)?;
        Ok(true)
    }

    async fn auction_bid(&self, params: PlaceBidParams) -> Result<bool, ErrorObjectOwned> {
        let sender = parse_sender(&params.sender)?;
        let ciphertext = hex::decode(&params.ciphertext)
            .map_err(|e| invalid_params(format!("invalid ciphertext hex: {e}")))?;
        let input_proof = hex::decode(&params.input_proof)
            .map_err(|e| invalid_params(format!("invalid proof hex: {e}")))?;

        let mut guard = self.state.write();
        let state = &mut *guard;
        let balance = state.balance_of(&sender);
        if balance < params.deposit {
            return Err(auction_err(AuctionError::InsufficientValue {
                required: params.deposit,
                available: balance,
            }));
        }
        let ctx = state.call_ctx(sender, params.deposit);
        handlers::handle_place_bid(
            &mut state.ledger,
            &mut state.fhe,
            &ctx,
            &ciphertext,
            &input_proof,
        )
        .map_err(auction_err)?;
        *state.balances.entry(sender).or_insert(0) -= params.deposit;
        Ok(true)
    }

    async fn auction_end(&self, params: SenderParams) -> Result<bool, ErrorObjectOwned> {
        let sender = parse_sender(&params.sender)?;
        let mut guard = self.state.write();
        let ctx = guard.call_ctx(sender, 0);
        handlers::handle_end_auction(&mut guard.ledger, &ctx).map_err(auction_err)?;
        Ok(true)
    }

    async fn auction_request_decryption(
        &self,
        params: SenderParams,
    ) -> Result<bool, ErrorObjectOwned> {
        let sender = parse_sender(&params.sender)?;
        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = state.call_ctx(sender, 0);
        handlers::handle_request_decryption(&mut state.ledger, &ctx, &mut state.oracle)
            .map_err(auction_err)?;
        Ok(true)
    }

    async fn auction_refund(&self, params: SenderParams) -> Result<u64, ErrorObjectOwned> {
        let sender = parse_sender(&params.sender)?;
        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = state.call_ctx(sender, 0);
        let payout = handlers::handle_refund(&mut state.ledger, &ctx).map_err(auction_err)?;
        state.credit(payout.to, payout.amount);
        Ok(payout.amount)
    }

    async fn auction_withdraw(&self, params: SenderParams) -> Result<bool, ErrorObjectOwned> {
        let sender = parse_sender(&params.sender)?;
        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = state.call_ctx(sender, 0);
        handlers::handle_withdraw_total_proceeds(&mut state.ledger, &ctx, &mut state.oracle)
            .map_err(auction_err)?;
        Ok(true)
    }

    async fn auction_reset(&self, params: SenderParams) -> Result<bool, ErrorObjectOwned> {
        let sender = parse_sender(&params.sender)?;
        let mut guard = self.state.write();
        let ctx = guard.call_ctx(sender, 0);
        handlers::handle_reset_auction(&mut guard.ledger, &ctx).map_err(auction_err)?;
        Ok(true)
    }

    async fn query_get_auction(&self) -> Result<AuctionInfoRpc, ErrorObjectOwned> {
        let guard = self.state.read();
        let ledger = &guard.ledger;
        Ok(AuctionInfoRpc {
            admin: ledger.admin.map(hex::encode),
            item: ledger.item.clone(),
            start_time: ledger.start_time,
            end_time: ledger.end_time,
            auction_started: ledger.phase.auction_started(),
            auction_ended: ledger.phase.auction_ended(),
            pool: ledger.pool,
        })
    }

    async fn query_get_deposit(&self, address: String) -> Result<u64, ErrorObjectOwned> {
        let address = parse_sender(&address)?;
        let guard = self.state.read();
        match handle_query(&guard.ledger, AuctionQuery::GetDeposit { address }) {
            AuctionQueryResponse::Deposit(deposit) => Ok(deposit),
            _ => Err(invalid_params("unexpected query response")),
        }
    }

    async fn query_get_winner(&self) -> Result<Option<WinnerInfoRpc>, ErrorObjectOwned> {
        let guard = self.state.read();
        match handle_query(&guard.ledger, AuctionQuery::GetWinnerInfo) {
            AuctionQueryResponse::WinnerInfo(info) => Ok(info.map(|w| WinnerInfoRpc {
                winner: hex::encode(w.winner),
                amount: w.amount,
            })),
            _ => Err(invalid_params("unexpected query response")),
        }
    }

    async fn query_get_decrypted_total(&self) -> Result<u64, ErrorObjectOwned> {
        let guard = self.state.read();
        Ok(guard.ledger.decrypted_total)
    }

    async fn query_get_balance(&self, address: String) -> Result<u64, ErrorObjectOwned> {
        let address = parse_sender(&address)?;
        let guard = self.state.read();
        Ok(guard.balance_of(&address))
    }

    async fn query_take_events(&self) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        let mut guard = self.state.write();
        Ok(guard
            .ledger
            .take_events()
            .into_iter()
            .map(EventRpc::from)
            .collect())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_mock_chain=info".parse()?),
        )
        .init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9944".to_string())
        .parse()?;

    let server = Server::builder().build(addr).await?;
    let local_addr = server.local_addr()?;
    info!(%local_addr, "Mock chain listening");

    let rpc = MockChainRpc::new();
    let handle = server.start(rpc.into_rpc());
    handle.stopped().await;
    Ok(())
}
