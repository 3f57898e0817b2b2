use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::execution::errors::EngineError;

/// USDC on Polygon settles with 6 decimals.
pub const COLLATERAL_TOKEN_DECIMALS: u32 = 6;

// ==================================================
// TICK SIZE → ROUNDING CONFIG
// ==================================================

/// The four tick sizes the CLOB quotes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickSize {
    Tenth,
    Hundredth,
    Thousandth,
    TenThousandth,
}

/// Maximum decimal places permitted for price, share size and notional
/// amount at a given tick size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundConfig {
    pub price: u32,
    pub size: u32,
    pub amount: u32,
}

impl TickSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickSize::Tenth => "0.1",
            TickSize::Hundredth => "0.01",
            TickSize::Thousandth => "0.001",
            TickSize::TenThousandth => "0.0001",
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        match self {
            TickSize::Tenth => dec!(0.1),
            TickSize::Hundredth => dec!(0.01),
            TickSize::Thousandth => dec!(0.001),
            TickSize::TenThousandth => dec!(0.0001),
        }
    }

    /// Total, immutable mapping — every tick size has exactly one config.
    pub fn round_config(&self) -> RoundConfig {
        match self {
            TickSize::Tenth => RoundConfig {
                price: 1,
                size: 2,
                amount: 3,
            },
            TickSize::Hundredth => RoundConfig {
                price: 2,
                size: 2,
                amount: 4,
            },
            TickSize::Thousandth => RoundConfig {
                price: 3,
                size: 2,
                amount: 5,
            },
            TickSize::TenThousandth => RoundConfig {
                price: 4,
                size: 2,
                amount: 6,
            },
        }
    }
}

impl fmt::Display for TickSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TickSize {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0.1" => Ok(TickSize::Tenth),
            "0.01" => Ok(TickSize::Hundredth),
            "0.001" => Ok(TickSize::Thousandth),
            "0.0001" => Ok(TickSize::TenThousandth),
            other => Err(EngineError::Validation(format!(
                "unknown tick size: {}",
                other
            ))),
        }
    }
}

impl TryFrom<Decimal> for TickSize {
    type Error = EngineError;

    fn try_from(d: Decimal) -> Result<Self, Self::Error> {
        let n = d.normalize();
        if n == dec!(0.1) {
            Ok(TickSize::Tenth)
        } else if n == dec!(0.01) {
            Ok(TickSize::Hundredth)
        } else if n == dec!(0.001) {
            Ok(TickSize::Thousandth)
        } else if n == dec!(0.0001) {
            Ok(TickSize::TenThousandth)
        } else {
            Err(EngineError::Validation(format!(
                "unknown tick size: {}",
                d
            )))
        }
    }
}

impl Serialize for TickSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TickSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ==================================================
// FIXED-POINT ROUNDING
// ==================================================

/// Fractional digits of the canonical representation (0 for integers).
pub fn decimal_places(x: Decimal) -> u32 {
    x.normalize().scale()
}

/// Truncate toward zero to at most `d` decimal places.
pub fn round_down(x: Decimal, d: u32) -> Decimal {
    if decimal_places(x) <= d {
        return x;
    }
    x.round_dp_with_strategy(d, RoundingStrategy::ToZero)
}

/// Round away from zero to at most `d` decimal places.
pub fn round_up(x: Decimal, d: u32) -> Decimal {
    if decimal_places(x) <= d {
        return x;
    }
    x.round_dp_with_strategy(d, RoundingStrategy::AwayFromZero)
}

/// Round to nearest (midpoint away from zero) to at most `d` decimal places.
pub fn round_normal(x: Decimal, d: u32) -> Decimal {
    if decimal_places(x) <= d {
        return x;
    }
    x.round_dp_with_strategy(d, RoundingStrategy::MidpointAwayFromZero)
}

/// A price is only tradable inside [tick, 1 - tick].
pub fn price_valid(price: Decimal, tick: TickSize) -> bool {
    let t = tick.as_decimal();
    price >= t && price <= Decimal::ONE - t
}

/// Overflow correction for computed maker/taker amounts: round up to
/// `cap + 4` digits first, then truncate to `cap` if still over. Rounding
/// error lands on the exchange's side instead of silently under-filling.
pub fn correct_overflow(x: Decimal, cap: u32) -> Decimal {
    if decimal_places(x) <= cap {
        return x;
    }
    let widened = round_up(x, cap + 4);
    if decimal_places(widened) > cap {
        round_down(widened, cap)
    } else {
        widened
    }
}

/// Scale a decimal amount to integer collateral base units (6 decimals) and
/// stringify it for the wire.
pub fn to_base_units(x: Decimal) -> Result<String, EngineError> {
    if x.is_sign_negative() {
        return Err(EngineError::Validation(format!(
            "amount must be non-negative, got {}",
            x
        )));
    }
    let scaled = x * Decimal::from(10u64.pow(COLLATERAL_TOKEN_DECIMALS));
    let units = scaled.trunc().to_u128().ok_or_else(|| {
        EngineError::Validation(format!("amount {} does not fit in base units", x))
    })?;
    Ok(units.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_size_mapping_is_total() {
        assert_eq!(
            TickSize::Tenth.round_config(),
            RoundConfig {
                price: 1,
                size: 2,
                amount: 3
            }
        );
        assert_eq!(
            TickSize::Hundredth.round_config(),
            RoundConfig {
                price: 2,
                size: 2,
                amount: 4
            }
        );
        assert_eq!(
            TickSize::Thousandth.round_config(),
            RoundConfig {
                price: 3,
                size: 2,
                amount: 5
            }
        );
        assert_eq!(
            TickSize::TenThousandth.round_config(),
            RoundConfig {
                price: 4,
                size: 2,
                amount: 6
            }
        );
    }

    #[test]
    fn tick_size_roundtrips_through_strings() {
        for tick in [
            TickSize::Tenth,
            TickSize::Hundredth,
            TickSize::Thousandth,
            TickSize::TenThousandth,
        ] {
            assert_eq!(tick.as_str().parse::<TickSize>().unwrap(), tick);
            assert_eq!(TickSize::try_from(tick.as_decimal()).unwrap(), tick);
        }
        assert!("0.05".parse::<TickSize>().is_err());
    }

    #[test]
    fn decimal_places_ignores_trailing_zeros() {
        assert_eq!(decimal_places(dec!(5)), 0);
        assert_eq!(decimal_places(dec!(5.0)), 0);
        assert_eq!(decimal_places(dec!(0.5)), 1);
        assert_eq!(decimal_places(dec!(0.123456)), 6);
        assert_eq!(decimal_places(dec!(1.2300)), 2);
    }

    #[test]
    fn rounding_brackets_the_input() {
        for x in [dec!(0.123456), dec!(7.777), dec!(10.000001)] {
            for d in 0..6u32 {
                assert!(round_down(x, d) <= x);
                assert!(round_up(x, d) >= x);
                assert!(decimal_places(round_normal(x, d)) <= d);
            }
        }
    }

    #[test]
    fn rounding_is_identity_when_within_cap() {
        assert_eq!(round_down(dec!(1.25), 2), dec!(1.25));
        assert_eq!(round_up(dec!(1.25), 2), dec!(1.25));
        assert_eq!(round_normal(dec!(1.25), 2), dec!(1.25));
        assert_eq!(round_down(dec!(3), 0), dec!(3));
    }

    #[test]
    fn round_normal_handles_midpoints() {
        assert_eq!(round_normal(dec!(10.125), 2), dec!(10.13));
        assert_eq!(round_normal(dec!(10.124), 2), dec!(10.12));
    }

    #[test]
    fn price_valid_matches_tick_bounds() {
        assert!(price_valid(dec!(0.5), TickSize::Hundredth));
        assert!(price_valid(dec!(0.01), TickSize::Hundredth));
        assert!(price_valid(dec!(0.99), TickSize::Hundredth));
        assert!(!price_valid(dec!(0.005), TickSize::Hundredth));
        assert!(!price_valid(dec!(0.995), TickSize::Hundredth));
        assert!(!price_valid(dec!(0.05), TickSize::Tenth));
    }

    #[test]
    fn correct_overflow_two_pass() {
        // within cap: untouched
        assert_eq!(correct_overflow(dec!(3.4815), 4), dec!(3.4815));
        // over cap even after widening: truncated to the cap
        assert_eq!(correct_overflow(dec!(1.234567891), 4), dec!(1.2345));
        // float-style tail collapses upward within the widened cap
        assert_eq!(correct_overflow(dec!(0.0200000000000004), 3), dec!(0.02));
    }

    #[test]
    fn base_unit_scaling() {
        assert_eq!(to_base_units(dec!(10)).unwrap(), "10000000");
        assert_eq!(to_base_units(dec!(5)).unwrap(), "5000000");
        assert_eq!(to_base_units(dec!(0.09765)).unwrap(), "97650");
        assert_eq!(to_base_units(dec!(0)).unwrap(), "0");
        assert!(to_base_units(dec!(-1)).is_err());
    }
}
