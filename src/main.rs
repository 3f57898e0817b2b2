use polymarket_wallet_trader::*;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use auth::store::FileCredentialStore;
use client::ClobHttp;
use config::{Args, Config, Endpoints};
use domain::order::{Side, TradeIntent};
use execution::orderbook::estimate_profit;
use execution::trader::Trader;
use wallet::signer::WalletSigner;
use wallet::submitter::ProviderSubmitter;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    args: Args,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create (or derive) exchange API credentials for the wallet
    Auth,
    /// Submit the seven on-chain approvals
    Approve,
    /// Print the order book for a token
    Book { token_id: String },
    /// Compute the executable market price for a side/amount
    Price {
        token_id: String,
        side: Side,
        amount: Decimal,
    },
    /// Market-buy a notional USDC amount of a token
    Buy {
        token_id: String,
        amount: Decimal,
        #[arg(long)]
        neg_risk: bool,
        /// Grant the exchange allowance first and wait for confirmation
        #[arg(long)]
        gated: bool,
    },
    /// Market-sell a share amount of a token
    Sell {
        token_id: String,
        amount: Decimal,
        #[arg(long)]
        neg_risk: bool,
        #[arg(long)]
        gated: bool,
    },
    /// List exchange-reported positions
    Positions {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// List recent trade/redeem activity
    Activity {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Redeem a resolved position (index into the positions list)
    Redeem { index: usize },
    /// Cancel a resting order
    Cancel { order_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.args.config)?;

    let endpoints = if cli.args.staging {
        Endpoints::staging()
    } else {
        config.endpoints()
    };
    let chain_id = config.wallet.chain_id;

    let private_key = std::env::var("PRIVATE_KEY").expect("PRIVATE_KEY missing in .env file");
    let rpc_url = config
        .wallet
        .rpc_url
        .clone()
        .or_else(|| std::env::var("RPC_URL").ok())
        .expect("RPC_URL missing in .env file");

    let signer = Arc::new(WalletSigner::new(&private_key, chain_id)?);
    let store = Arc::new(FileCredentialStore::new(config.trading.api_key_store.clone()));
    let submitter = Arc::new(ProviderSubmitter::new(&rpc_url, &private_key, chain_id)?);
    let http = ClobHttp::new(endpoints);

    let trader = Trader::new(
        http.clone(),
        signer,
        store,
        submitter,
        chain_id,
        Duration::from_secs(config.trading.confirmation_timeout_secs),
    );

    if !trader.is_network_supported() {
        anyhow::bail!(
            "network not supported: {}",
            trader.network_error().unwrap_or("unknown chain")
        );
    }

    info!("🔑 Trading as {}", trader.auth().address());

    match cli.command {
        Command::Auth => {
            let creds = trader.ensure_credentials().await?;
            info!("✅ API key ready: {}", creds.key);
        }

        Command::Approve => {
            let handles = trader.approve_allowances().await?;
            for handle in handles {
                info!("   submitted {}", handle.id);
            }
        }

        Command::Book { token_id } => {
            let book = http.get_order_book(&token_id).await?;
            println!("{}", serde_json::to_string_pretty(&book)?);
        }

        Command::Price {
            token_id,
            side,
            amount,
        } => {
            let engine = execution::orderbook::PriceEngine::new(http.clone());
            let price = engine
                .calculate_market_price(&token_id, side, amount, domain::order::OrderType::Fok)
                .await?;
            println!("{}", price);
        }

        Command::Buy {
            token_id,
            amount,
            neg_risk,
            gated,
        } => {
            place(&trader, &http, token_id, Side::Buy, amount, neg_risk, gated).await?;
        }

        Command::Sell {
            token_id,
            amount,
            neg_risk,
            gated,
        } => {
            place(&trader, &http, token_id, Side::Sell, amount, neg_risk, gated).await?;
        }

        Command::Positions { limit } => {
            let positions = trader.positions(limit).await?;
            for (i, p) in positions.iter().enumerate() {
                println!(
                    "{:>3}  {}  {} @ {} (now {}){}",
                    i,
                    p.title,
                    p.size,
                    p.avg_price,
                    p.cur_price,
                    if p.redeemable { "  [redeemable]" } else { "" }
                );
            }
        }

        Command::Activity { limit } => {
            let activity = trader.activity(limit).await?;
            for a in activity {
                let when = chrono::DateTime::from_timestamp(a.timestamp, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| a.timestamp.to_string());
                println!(
                    "{}  {:<6} {:<4} {} @ {}",
                    when, a.activity_type, a.side, a.size, a.price
                );
            }
        }

        Command::Redeem { index } => {
            let positions = trader.positions(100).await?;
            let position = positions
                .get(index)
                .ok_or_else(|| anyhow::anyhow!("no position at index {}", index))?;
            match trader.redeem_position(position).await? {
                Some(handle) => info!("💸 Redeem submitted as {}", handle.id),
                None => info!("Nothing to redeem"),
            }
        }

        Command::Cancel { order_id } => {
            let resp = trader.cancel_order(&order_id).await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
    }

    Ok(())
}

async fn place(
    trader: &Trader,
    http: &ClobHttp,
    token_id: String,
    side: Side,
    amount: Decimal,
    neg_risk: bool,
    gated: bool,
) -> Result<()> {
    let tick_size = http.get_tick_size(&token_id).await?;

    // pre-trade summary from the same book the price walk will use
    if let Ok(book) = http.get_order_book(&token_id).await {
        if let Ok(est) = estimate_profit(&book, side, amount) {
            info!(
                "📊 ~{:.2} shares, avg price {:.4}, potential profit ${:.2} ({:.1}% ROI)",
                est.shares, est.average_price, est.potential_profit, est.roi
            );
        }
    }

    let intent = TradeIntent {
        token_id,
        side,
        amount,
        tick_size,
        neg_risk,
    };

    let resp = if gated {
        trader.place_order_gated(&intent).await?
    } else {
        trader.place_order(&intent).await?
    };

    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}
