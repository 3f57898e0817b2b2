use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::execution::errors::EngineError;
use crate::rounding::TickSize;

/// Public orders carry the zero address as taker.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ==================================================
// ENUMS
// ==================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// On-chain representation used inside the EIP-712 order struct.
    pub fn as_u8(&self) -> u8 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(EngineError::Validation(format!("unknown side: {}", other))),
        }
    }
}

/// Execution policy for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Gtc,
    Fok,
    Gtd,
    Fak,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Gtc => "GTC",
            OrderType::Fok => "FOK",
            OrderType::Gtd => "GTD",
            OrderType::Fak => "FAK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureType {
    /// ECDSA EIP-712 signature from an EOA.
    Eoa,
    /// EOA signature on behalf of a Polymarket proxy wallet.
    PolyProxy,
    /// EOA signature on behalf of a Polymarket Gnosis safe.
    PolyGnosisSafe,
}

impl SignatureType {
    pub fn as_u8(&self) -> u8 {
        match self {
            SignatureType::Eoa => 0,
            SignatureType::PolyProxy => 1,
            SignatureType::PolyGnosisSafe => 2,
        }
    }
}

// ==================================================
// USER INTENT
// ==================================================

/// A single user trade request, consumed once by the orchestrator.
/// `amount` means notional USDC to spend for BUY and shares to sell for SELL.
#[derive(Debug, Clone)]
pub struct TradeIntent {
    pub token_id: String,
    pub side: Side,
    pub amount: Decimal,
    pub tick_size: TickSize,
    pub neg_risk: bool,
}

// ==================================================
// WIRE ORDER
// ==================================================

/// Fully populated order struct, pre-signature. Maker/taker amounts are
/// integer strings in collateral base units.
#[derive(Debug, Clone)]
pub struct OrderData {
    pub salt: u64,
    pub maker: String,
    pub signer: String,
    pub taker: String,
    pub token_id: String,
    pub maker_amount: String,
    pub taker_amount: String,
    pub expiration: String,
    pub nonce: String,
    pub fee_rate_bps: String,
    pub side: Side,
    pub signature_type: SignatureType,
}

/// Signed order as the exchange expects it in the POST body. The salt is
/// serialized as a bare integer and the side as "BUY"/"SELL".
#[derive(Debug, Clone, Serialize)]
pub struct WireOrder {
    pub salt: u64,
    pub maker: String,
    pub signer: String,
    pub taker: String,
    #[serde(rename = "tokenId")]
    pub token_id: String,
    #[serde(rename = "makerAmount")]
    pub maker_amount: String,
    #[serde(rename = "takerAmount")]
    pub taker_amount: String,
    pub expiration: String,
    pub nonce: String,
    #[serde(rename = "feeRateBps")]
    pub fee_rate_bps: String,
    pub side: Side,
    #[serde(rename = "signatureType")]
    pub signature_type: u8,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPayload {
    pub order: WireOrder,
    pub owner: String,
    #[serde(rename = "orderType")]
    pub order_type: OrderType,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelPayload {
    #[serde(rename = "orderID")]
    pub order_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"SELL\"");
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
    }

    #[test]
    fn order_type_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&OrderType::Fok).unwrap(), "\"FOK\"");
        assert_eq!(serde_json::to_string(&OrderType::Fak).unwrap(), "\"FAK\"");
    }

    #[test]
    fn wire_order_salt_is_a_bare_integer() {
        let order = WireOrder {
            salt: 12345,
            maker: ZERO_ADDRESS.to_string(),
            signer: ZERO_ADDRESS.to_string(),
            taker: ZERO_ADDRESS.to_string(),
            token_id: "1".to_string(),
            maker_amount: "5000000".to_string(),
            taker_amount: "10000000".to_string(),
            expiration: "0".to_string(),
            nonce: "0".to_string(),
            fee_rate_bps: "0".to_string(),
            side: Side::Buy,
            signature_type: 0,
            signature: "0x".to_string(),
        };
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"salt\":12345"));
        assert!(json.contains("\"side\":\"BUY\""));
        assert!(json.contains("\"makerAmount\":\"5000000\""));
        assert!(json.contains("\"signatureType\":0"));
    }
}
