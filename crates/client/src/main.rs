//! CLI for the confidential sealed-bid auction.
//!
//! This binary provides commands for the full lifecycle:
//! - Starting, ending, and resetting sessions
//! - Submitting sealed bids
//! - Requesting decryption and pumping oracle callbacks
//! - Claiming refunds and withdrawing proceeds
//! - Querying auction state

use anyhow::Result;
use clap::{Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use rand::rngs::OsRng;
use serde_json::json;
use tracing::info;

use auction_client::encrypt_bid;
use auction_client::query;

#[derive(Parser)]
#[command(name = "auction-cli")]
#[command(about = "CLI for the confidential sealed-bid auction")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session; the sender becomes admin
    Start {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        /// Bidding window length in seconds
        #[arg(long)]
        duration: u64,
    },

    /// Set the auctioned item description
    SetItem {
        /// Sender address (hex, must be admin)
        #[arg(long)]
        sender: String,

        /// Item description
        #[arg(long)]
        item: String,
    },

    /// Submit a sealed bid
    Bid {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        /// Bid amount (sealed before submission)
        #[arg(long)]
        amount: u64,

        /// Deposit amount (visible on-chain)
        #[arg(long)]
        deposit: u64,
    },

    /// Close bidding
    End {
        /// Sender address (hex, must be admin)
        #[arg(long)]
        sender: String,
    },

    /// Fire the winner reveal requests
    RequestDecryption {
        /// Sender address (hex, must be admin)
        #[arg(long)]
        sender: String,
    },

    /// Claim the sender's refund
    Refund {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,
    },

    /// Reveal and withdraw accumulated proceeds
    Withdraw {
        /// Sender address (hex, must be admin)
        #[arg(long)]
        sender: String,
    },

    /// Reset the session
    Reset {
        /// Sender address (hex, must be admin)
        #[arg(long)]
        sender: String,
    },

    /// Seed an account balance (test-time faucet)
    Fund {
        /// Address (hex)
        #[arg(long)]
        address: String,

        /// Amount to credit
        #[arg(long)]
        amount: u64,
    },

    /// Get the plaintext auction snapshot
    GetAuction,

    /// Get the revealed winner, if announced
    GetWinner,

    /// Get the deposit held for an identity
    GetDeposit {
        /// Address (hex)
        #[arg(long)]
        address: String,
    },

    /// Get the native balance of an identity
    GetBalance {
        /// Address (hex)
        #[arg(long)]
        address: String,
    },

    /// Get the aggregate revealed by the latest withdrawal
    GetTotal,

    /// Drain emitted notifications
    Events,

    /// List pending oracle request ids
    Pending,

    /// Deliver oracle callbacks (one id, or all pending)
    Deliver {
        /// Specific request id; delivers everything when omitted
        #[arg(long)]
        request_id: Option<u64>,
    },

    /// Advance chain time by one block (for testing)
    AdvanceBlock,

    /// Set the chain timestamp (for testing)
    SetTimestamp {
        /// Unix timestamp to set
        #[arg(long)]
        timestamp: u64,
    },
}

async fn bid_cmd(client: &HttpClient, sender: &str, amount: u64, deposit: u64) -> Result<()> {
    let sealed = encrypt_bid(amount, &mut OsRng);

    let params = json!({
        "sender": sender,
        "ciphertext": hex::encode(&sealed.ciphertext),
        "input_proof": hex::encode(&sealed.proof),
        "deposit": deposit,
    });
    let _ok: bool = client.request("auction_bid", rpc_params![params]).await?;

    info!(deposit, "Bid submitted");
    println!("Bid submitted");
    println!("  Amount: {} (sealed)", amount);
    println!("  Deposit: {}", deposit);
    Ok(())
}

async fn get_auction_cmd(client: &HttpClient) -> Result<()> {
    let info = query::get_auction(client).await?;
    println!("Auction:");
    match &info.admin {
        Some(admin) => println!("  Admin: {}", admin),
        None => println!("  Admin: (open)"),
    }
    if !info.item.is_empty() {
        println!("  Item: {}", info.item);
    }
    println!("  Started: {}", info.auction_started);
    println!("  Ended: {}", info.auction_ended);
    println!("  Window: {} - {}", info.start_time, info.end_time);
    println!("  Pool: {}", info.pool);
    Ok(())
}

async fn get_winner_cmd(client: &HttpClient) -> Result<()> {
    match query::get_winner(client).await? {
        Some(winner) => {
            println!("Winner: {}", winner.winner);
            println!("  Amount: {}", winner.amount);
        }
        None => println!("Winner not announced yet"),
    }
    Ok(())
}

async fn deliver_cmd(client: &HttpClient, request_id: Option<u64>) -> Result<()> {
    #[derive(serde::Deserialize)]
    struct CallbackInfo {
        request_id: u64,
        kind: String,
    }

    let delivered: Vec<CallbackInfo> = match request_id {
        Some(id) => {
            let one: CallbackInfo = client.request("oracle_deliver", rpc_params![id]).await?;
            vec![one]
        }
        None => client.request("oracle_deliverAll", rpc_params![]).await?,
    };

    if delivered.is_empty() {
        println!("No pending callbacks");
    } else {
        for cb in delivered {
            println!("Delivered {} callback (request {})", cb.kind, cb.request_id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = HttpClientBuilder::default().build(&cli.rpc)?;

    match cli.command {
        Commands::Start { sender, duration } => {
            let params = json!({ "sender": sender.as_str(), "duration": duration });
            let _ok: bool = client.request("auction_start", rpc_params![params]).await?;
            println!("Auction started (admin: {}, duration: {}s)", sender, duration);
        }

        Commands::SetItem { sender, item } => {
            let params = json!({ "sender": sender, "item": item });
            let _ok: bool = client
                .request("auction_setItem", rpc_params![params])
                .await?;
            println!("Item set");
        }

        Commands::Bid {
            sender,
            amount,
            deposit,
        } => {
            bid_cmd(&client, &sender, amount, deposit).await?;
        }

        Commands::End { sender } => {
            let params = json!({ "sender": sender });
            let _ok: bool = client.request("auction_end", rpc_params![params]).await?;
            println!("Bidding closed");
        }

        Commands::RequestDecryption { sender } => {
            let params = json!({ "sender": sender });
            let _ok: bool = client
                .request("auction_requestDecryption", rpc_params![params])
                .await?;
            println!("Reveal requested; callbacks pending");
        }

        Commands::Refund { sender } => {
            let params = json!({ "sender": sender });
            let amount: u64 = client
                .request("auction_refund", rpc_params![params])
                .await?;
            println!("Refunded {}", amount);
        }

        Commands::Withdraw { sender } => {
            let params = json!({ "sender": sender });
            let _ok: bool = client
                .request("auction_withdraw", rpc_params![params])
                .await?;
            println!("Withdrawal requested; callback pending");
        }

        Commands::Reset { sender } => {
            let params = json!({ "sender": sender });
            let _ok: bool = client.request("auction_reset", rpc_params![params]).await?;
            println!("Auction reset");
        }

        Commands::Fund { address, amount } => {
            let params = json!({ "address": address, "amount": amount });
            let balance: u64 = client.request("admin_fund", rpc_params![params]).await?;
            println!("Balance: {}", balance);
        }

        Commands::GetAuction => {
            get_auction_cmd(&client).await?;
        }

        Commands::GetWinner => {
            get_winner_cmd(&client).await?;
        }

        Commands::GetDeposit { address } => {
            let deposit = query::get_deposit(&client, &address).await?;
            println!("Deposit: {}", deposit);
        }

        Commands::GetBalance { address } => {
            let balance = query::get_balance(&client, &address).await?;
            println!("Balance: {}", balance);
        }

        Commands::GetTotal => {
            let total = query::get_decrypted_total(&client).await?;
            println!("Decrypted total proceeds: {}", total);
        }

        Commands::Events => {
            let events = query::take_events(&client).await?;
            if events.is_empty() {
                println!("No new events");
            } else {
                for event in events {
                    println!("{}", event);
                }
            }
        }

        Commands::Pending => {
            let pending = query::pending_requests(&client).await?;
            if pending.is_empty() {
                println!("No pending decryption requests");
            } else {
                println!("Pending request ids: {:?}", pending);
            }
        }

        Commands::Deliver { request_id } => {
            deliver_cmd(&client, request_id).await?;
        }

        Commands::AdvanceBlock => {
            #[derive(serde::Deserialize)]
            struct BlockInfo {
                height: u64,
                timestamp: u64,
            }
            let block: BlockInfo = client
                .request("admin_advanceBlock", rpc_params![])
                .await?;
            println!(
                "Block advanced: height={}, timestamp={}",
                block.height, block.timestamp
            );
        }

        Commands::SetTimestamp { timestamp } => {
            let _ok: bool = client
                .request("admin_setTimestamp", rpc_params![timestamp])
                .await?;
            println!("Timestamp set to {}", timestamp);
        }
    }

    Ok(())
}
