//! Typed query wrappers over the mock chain RPC.

use anyhow::Result;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::HttpClient;
use jsonrpsee::rpc_params;
use serde::{Deserialize, Serialize};

/// Snapshot of the plaintext ledger fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionInfo {
    pub admin: Option<String>,
    pub item: String,
    pub start_time: u64,
    pub end_time: u64,
    pub auction_started: bool,
    pub auction_ended: bool,
    pub pool: u64,
}

/// Revealed winner info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerInfo {
    pub winner: String,
    pub amount: u64,
}

pub async fn get_auction(client: &HttpClient) -> Result<AuctionInfo> {
    Ok(client.request("query_getAuction", rpc_params![]).await?)
}

pub async fn get_winner(client: &HttpClient) -> Result<Option<WinnerInfo>> {
    Ok(client.request("query_getWinner", rpc_params![]).await?)
}

pub async fn get_deposit(client: &HttpClient, address: &str) -> Result<u64> {
    Ok(client.request("query_getDeposit", rpc_params![address]).await?)
}

pub async fn get_balance(client: &HttpClient, address: &str) -> Result<u64> {
    Ok(client.request("query_getBalance", rpc_params![address]).await?)
}

pub async fn get_decrypted_total(client: &HttpClient) -> Result<u64> {
    Ok(client.request("query_getDecryptedTotal", rpc_params![]).await?)
}

pub async fn take_events(client: &HttpClient) -> Result<Vec<serde_json::Value>> {
    Ok(client.request("query_takeEvents", rpc_params![]).await?)
}

pub async fn pending_requests(client: &HttpClient) -> Result<Vec<u64>> {
    Ok(client.request("oracle_pending", rpc_params![]).await?)
}
