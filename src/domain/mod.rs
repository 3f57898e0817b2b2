use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod order;

// ==================================================
// ORDER BOOK
// ==================================================

/// One fresh snapshot per pricing call — the book is never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub bids: Vec<OrderBookEntry>,
    #[serde(default)]
    pub asks: Vec<OrderBookEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookEntry {
    pub price: Decimal,
    pub size: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickSizeResponse {
    pub minimum_tick_size: Decimal,
}

// ==================================================
// API CREDENTIALS
// ==================================================

/// Shape returned by the auth endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyRaw {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

/// Persisted per wallet address; read on every L2 header computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyCreds {
    pub key: String,
    pub secret: String,
    pub passphrase: String,
}

// ==================================================
// DATA API SNAPSHOTS
// ==================================================

/// Exchange-reported holding. The `redeemable` flag gates the on-chain
/// redeem transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(default)]
    pub proxy_wallet: String,
    pub asset: String,
    pub condition_id: String,
    pub size: Decimal,
    pub avg_price: Decimal,
    pub cur_price: Decimal,
    #[serde(default)]
    pub current_value: Decimal,
    #[serde(default)]
    pub cash_pnl: Decimal,
    pub redeemable: bool,
    pub outcome_index: u32,
    #[serde(default)]
    pub negative_risk: bool,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub end_date: String,
}

/// Trade/redeem activity record from the data API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default)]
    pub proxy_wallet: String,
    pub timestamp: i64,
    pub condition_id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub size: Decimal,
    #[serde(default)]
    pub usdc_size: Decimal,
    #[serde(default)]
    pub transaction_hash: String,
    #[serde(default)]
    pub price: Decimal,
    pub asset: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub outcome_index: u32,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub title: String,
}
