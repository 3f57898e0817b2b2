use ethers::types::transaction::eip712::TypedData;
use ethers::utils::to_checksum;
use rand::Rng;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{AuthManager, L2HeaderArgs};
use crate::client::ClobHttp;
use crate::config::contracts::ContractConfig;
use crate::domain::order::{
    OrderData, OrderPayload, OrderType, Side, SignatureType, TradeIntent, WireOrder, ZERO_ADDRESS,
};
use crate::execution::errors::EngineError;
use crate::execution::orderbook::PriceEngine;
use crate::rounding::{
    correct_overflow, price_valid, round_down, round_normal, to_base_units, RoundConfig,
};
use crate::wallet::signer::{signature_to_hex, TypedDataSigner};

pub const EXCHANGE_DOMAIN_NAME: &str = "Polymarket CTF Exchange";
pub const EXCHANGE_DOMAIN_VERSION: &str = "1";

/// The exchange parses the salt as an IEEE-754 number, so it must stay
/// below 2^53. Sourced from a CSPRNG to keep order hashes collision-free.
pub fn generate_salt() -> u64 {
    rand::rng().random::<u64>() & ((1 << 53) - 1)
}

/// Raw (un-scaled) maker/taker amounts for a market order at a given price.
/// BUY: taker = shares bought, maker = notional given. SELL: maker = shares
/// given, taker = notional received. The computed product is overflow-
/// corrected to the tick's amount precision.
pub fn market_order_raw_amounts(
    side: Side,
    amount: Decimal,
    price: Decimal,
    config: RoundConfig,
) -> (Decimal, Decimal) {
    let raw_price = round_normal(price, config.price);

    match side {
        Side::Buy => {
            let raw_taker = round_down(amount, config.size);
            let raw_maker = correct_overflow(raw_taker * raw_price, config.amount);
            (raw_maker, raw_taker)
        }
        Side::Sell => {
            let raw_maker = round_down(amount, config.size);
            let raw_taker = correct_overflow(raw_maker * raw_price, config.amount);
            (raw_maker, raw_taker)
        }
    }
}

/// Converts a user trade intent into a fully populated, signed order payload
/// and submits it with L2 headers computed over the exact request body.
pub struct OrderBuilder {
    http: ClobHttp,
    auth: Arc<AuthManager>,
    signer: Arc<dyn TypedDataSigner>,
    price_engine: PriceEngine,
    contracts: ContractConfig,
    chain_id: u64,
}

impl OrderBuilder {
    pub fn new(
        http: ClobHttp,
        auth: Arc<AuthManager>,
        signer: Arc<dyn TypedDataSigner>,
        contracts: ContractConfig,
        chain_id: u64,
    ) -> Self {
        let price_engine = PriceEngine::new(http.clone());
        Self {
            http,
            auth,
            signer,
            price_engine,
            contracts,
            chain_id,
        }
    }

    /// Price the intent from book depth and build the unsigned order struct.
    /// Rejects out-of-bounds prices before anything is signed or sent.
    pub async fn build_order_data(
        &self,
        intent: &TradeIntent,
        order_type: OrderType,
    ) -> Result<OrderData, EngineError> {
        let price = self
            .price_engine
            .calculate_market_price(&intent.token_id, intent.side, intent.amount, order_type)
            .await?;

        self.order_data_at_price(intent, price)
    }

    /// Same as `build_order_data` but with an already-computed price.
    pub fn order_data_at_price(
        &self,
        intent: &TradeIntent,
        price: Decimal,
    ) -> Result<OrderData, EngineError> {
        if !price_valid(price, intent.tick_size) {
            let tick = intent.tick_size.as_decimal();
            return Err(EngineError::InvalidPrice {
                price,
                min: tick,
                max: Decimal::ONE - tick,
            });
        }

        let config = intent.tick_size.round_config();
        let (raw_maker, raw_taker) =
            market_order_raw_amounts(intent.side, intent.amount, price, config);

        let address = to_checksum(&self.signer.address(), None);

        Ok(OrderData {
            salt: generate_salt(),
            maker: address.clone(),
            signer: address,
            taker: ZERO_ADDRESS.to_string(),
            token_id: intent.token_id.clone(),
            maker_amount: to_base_units(raw_maker)?,
            taker_amount: to_base_units(raw_taker)?,
            expiration: "0".to_string(),
            nonce: "0".to_string(),
            fee_rate_bps: "0".to_string(),
            side: intent.side,
            signature_type: SignatureType::Eoa,
        })
    }

    /// EIP-712 payload for the 12-field Order schema. negRisk markets verify
    /// against the adapter-paired exchange contract.
    pub fn order_typed_data(
        &self,
        order: &OrderData,
        neg_risk: bool,
    ) -> Result<TypedData, EngineError> {
        let verifying_contract = if neg_risk {
            self.contracts.neg_risk_exchange
        } else {
            self.contracts.exchange
        };

        serde_json::from_value(json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "Order": [
                    { "name": "salt", "type": "uint256" },
                    { "name": "maker", "type": "address" },
                    { "name": "signer", "type": "address" },
                    { "name": "taker", "type": "address" },
                    { "name": "tokenId", "type": "uint256" },
                    { "name": "makerAmount", "type": "uint256" },
                    { "name": "takerAmount", "type": "uint256" },
                    { "name": "expiration", "type": "uint256" },
                    { "name": "nonce", "type": "uint256" },
                    { "name": "feeRateBps", "type": "uint256" },
                    { "name": "side", "type": "uint8" },
                    { "name": "signatureType", "type": "uint8" }
                ]
            },
            "primaryType": "Order",
            "domain": {
                "name": EXCHANGE_DOMAIN_NAME,
                "version": EXCHANGE_DOMAIN_VERSION,
                "chainId": self.chain_id,
                "verifyingContract": format!("{:#x}", verifying_contract)
            },
            "message": {
                "salt": order.salt.to_string(),
                "maker": order.maker,
                "signer": order.signer,
                "taker": order.taker,
                "tokenId": order.token_id,
                "makerAmount": order.maker_amount,
                "takerAmount": order.taker_amount,
                "expiration": order.expiration,
                "nonce": order.nonce,
                "feeRateBps": order.fee_rate_bps,
                "side": order.side.as_u8(),
                "signatureType": order.signature_type.as_u8()
            }
        }))
        .map_err(|e| EngineError::Signing(format!("bad order typed data: {}", e)))
    }

    pub async fn sign_order(
        &self,
        order: OrderData,
        neg_risk: bool,
    ) -> Result<WireOrder, EngineError> {
        let typed_data = self.order_typed_data(&order, neg_risk)?;
        let signature = self.signer.sign_typed_data(&typed_data).await?;

        Ok(WireOrder {
            salt: order.salt,
            maker: order.maker,
            signer: order.signer,
            taker: order.taker,
            token_id: order.token_id,
            maker_amount: order.maker_amount,
            taker_amount: order.taker_amount,
            expiration: order.expiration,
            nonce: order.nonce,
            fee_rate_bps: order.fee_rate_bps,
            side: order.side,
            signature_type: order.signature_type.as_u8(),
            signature: signature_to_hex(&signature),
        })
    }

    /// Full sequence: price, validate, build, sign, submit. The L2 HMAC is
    /// computed over the exact body string that goes on the wire.
    pub async fn place_market_order(
        &self,
        intent: &TradeIntent,
        order_type: OrderType,
    ) -> Result<Value, EngineError> {
        let creds = self.auth.credentials()?.ok_or(EngineError::MissingCredentials {
            address: self.auth.address(),
        })?;

        let order = self.build_order_data(intent, order_type).await?;
        let signed = self.sign_order(order, intent.neg_risk).await?;

        let payload = OrderPayload {
            order: signed,
            owner: creds.key,
            order_type,
        };
        let body = serde_json::to_string(&payload)?;

        let l2 = self.auth.create_l2_headers(
            &L2HeaderArgs {
                method: "POST".to_string(),
                request_path: "/order".to_string(),
                body: Some(body.clone()),
            },
            None,
        )?;

        self.http.post_order(body, l2.to_header_map()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use crate::config::contracts::contract_config;
    use crate::config::Endpoints;
    use crate::rounding::TickSize;
    use crate::wallet::signer::WalletSigner;
    use rust_decimal_macros::dec;

    #[test]
    fn buy_raw_amounts_match_the_documented_example() {
        // amount=10 @ 0.5 with {price:2, size:2, amount:4}
        let cfg = TickSize::Hundredth.round_config();
        let (maker, taker) = market_order_raw_amounts(Side::Buy, dec!(10), dec!(0.5), cfg);
        assert_eq!(taker, dec!(10));
        assert_eq!(maker, dec!(5));
    }

    #[test]
    fn sell_raw_amounts_mirror_the_buy_shape() {
        let cfg = TickSize::Hundredth.round_config();
        let (maker, taker) = market_order_raw_amounts(Side::Sell, dec!(10), dec!(0.5), cfg);
        assert_eq!(maker, dec!(10));
        assert_eq!(taker, dec!(5));
    }

    #[test]
    fn raw_amounts_round_size_down_first() {
        let cfg = TickSize::Hundredth.round_config();
        let (maker, taker) = market_order_raw_amounts(Side::Buy, dec!(10.559), dec!(0.33), cfg);
        assert_eq!(taker, dec!(10.55));
        assert_eq!(maker, dec!(3.4815));
    }

    #[test]
    fn salt_fits_in_an_ieee_754_double() {
        for _ in 0..64 {
            assert!(generate_salt() < (1 << 53));
        }
    }

    fn builder() -> OrderBuilder {
        let signer = Arc::new(
            WalletSigner::new(
                "0000000000000000000000000000000000000000000000000000000000000001",
                137,
            )
            .unwrap(),
        );
        let http = ClobHttp::new(Endpoints::production());
        let auth = Arc::new(AuthManager::new(
            http.clone(),
            signer.clone(),
            Arc::new(MemoryCredentialStore::new()),
            137,
        ));
        OrderBuilder::new(http, auth, signer, contract_config(137).unwrap(), 137)
    }

    fn intent(side: Side) -> TradeIntent {
        TradeIntent {
            token_id: "123456".to_string(),
            side,
            amount: dec!(10),
            tick_size: TickSize::Hundredth,
            neg_risk: false,
        }
    }

    #[test]
    fn out_of_bounds_price_is_rejected_before_signing() {
        let builder = builder();
        match builder.order_data_at_price(&intent(Side::Buy), dec!(0.005)) {
            Err(EngineError::InvalidPrice { min, max, .. }) => {
                assert_eq!(min, dec!(0.01));
                assert_eq!(max, dec!(0.99));
            }
            other => panic!("expected InvalidPrice, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn order_data_populates_defaults_and_base_units() {
        let builder = builder();
        let order = builder
            .order_data_at_price(&intent(Side::Buy), dec!(0.5))
            .unwrap();

        assert_eq!(order.taker, ZERO_ADDRESS);
        assert_eq!(order.fee_rate_bps, "0");
        assert_eq!(order.nonce, "0");
        assert_eq!(order.expiration, "0");
        assert_eq!(order.signature_type, SignatureType::Eoa);
        assert_eq!(order.maker, order.signer);
        assert_eq!(order.taker_amount, "10000000");
        assert_eq!(order.maker_amount, "5000000");
        assert!(order.salt < (1 << 53));
    }

    #[test]
    fn neg_risk_switches_the_verifying_contract() {
        let builder = builder();
        let order = builder
            .order_data_at_price(&intent(Side::Buy), dec!(0.5))
            .unwrap();

        let plain = builder.order_typed_data(&order, false).unwrap();
        let neg = builder.order_typed_data(&order, true).unwrap();
        assert_ne!(
            plain.domain.verifying_contract,
            neg.domain.verifying_contract
        );
        assert_eq!(plain.primary_type, "Order");
        assert_eq!(plain.domain.name.as_deref(), Some(EXCHANGE_DOMAIN_NAME));
    }

    #[tokio::test]
    async fn signed_order_carries_a_65_byte_signature() {
        let builder = builder();
        let order = builder
            .order_data_at_price(&intent(Side::Sell), dec!(0.5))
            .unwrap();
        let signed = builder.sign_order(order, false).await.unwrap();
        assert!(signed.signature.starts_with("0x"));
        assert_eq!(signed.signature.len(), 2 + 65 * 2);
        assert_eq!(signed.side, Side::Sell);
    }

    #[tokio::test]
    async fn signing_is_deterministic_for_a_fixed_order() {
        let builder = builder();
        let mut order = builder
            .order_data_at_price(&intent(Side::Buy), dec!(0.5))
            .unwrap();
        order.salt = 42;
        let a = builder.sign_order(order.clone(), false).await.unwrap();
        let b = builder.sign_order(order, false).await.unwrap();
        assert_eq!(a.signature, b.signature);
    }
}
