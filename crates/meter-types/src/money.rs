//! Fixed-point money
//!
//! Amounts are held as integer micro-units (1e-6 of the currency unit) so that
//! summing many plan costs never drifts. They cross the wire and the database
//! as decimals.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::TypeError;

/// Number of decimal places carried by [`Money`]
pub const MONEY_SCALE: u32 = 6;

/// Micro-units per whole currency unit
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Minimum number of decimal places used when rendering an amount
const DISPLAY_SCALE: u32 = 2;

/// Signed amount in micro-units (1e-6 of the currency unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Build from raw micro-units
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Raw micro-units
    pub const fn micros(self) -> i64 {
        self.0
    }

    /// Convert a decimal amount, rejecting sub-micro precision
    pub fn from_decimal(amount: Decimal) -> Result<Self, TypeError> {
        let scaled = amount
            .checked_mul(Decimal::from(MICROS_PER_UNIT))
            .ok_or(TypeError::AmountOverflow)?;
        if !scaled.fract().is_zero() {
            return Err(TypeError::AmountTooPrecise(MONEY_SCALE));
        }
        scaled
            .to_i64()
            .map(Self)
            .ok_or(TypeError::AmountOverflow)
    }

    /// Decimal view, trimmed but never below two decimal places
    pub fn to_decimal(self) -> Decimal {
        let mut amount = Decimal::new(self.0, MONEY_SCALE).normalize();
        if amount.scale() < DISPLAY_SCALE {
            amount.rescale(DISPLAY_SCALE);
        }
        amount
    }

    /// `self + other`, `None` on overflow
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// `self * units`, `None` on overflow
    pub fn checked_mul(self, units: i64) -> Option<Self> {
        self.0.checked_mul(units).map(Self)
    }

    /// Whether the amount is zero
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Money {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let amount = Decimal::from_str(raw).map_err(|err| match err {
            rust_decimal::Error::ExceedsMaximumPossibleValue
            | rust_decimal::Error::LessThanMinimumPossibleValue => TypeError::AmountOverflow,
            _ => TypeError::InvalidAmount(raw.to_string()),
        })?;
        Self::from_decimal(amount)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = TypeError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.to_decimal()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cent_price_times_units_is_exact() {
        let price: Money = "0.01".parse().unwrap();
        assert_eq!(price.micros(), 10_000);

        let cost = price.checked_mul(4000).unwrap();
        assert_eq!(cost.to_string(), "40.00");
    }

    #[test]
    fn test_display_keeps_sub_cent_precision() {
        let price: Money = "0.0005".parse().unwrap();
        assert_eq!(price.to_string(), "0.0005");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_rejects_more_than_six_places() {
        let err = "0.0000001".parse::<Money>().unwrap_err();
        assert_eq!(err, TypeError::AmountTooPrecise(MONEY_SCALE));
    }

    #[test]
    fn test_parse_failure_is_not_an_overflow() {
        assert_eq!(
            "abc".parse::<Money>().unwrap_err(),
            TypeError::InvalidAmount("abc".to_string())
        );
        assert_eq!(
            "".parse::<Money>().unwrap_err(),
            TypeError::InvalidAmount(String::new())
        );
        assert_eq!(
            "9223372036854775807".parse::<Money>().unwrap_err(),
            TypeError::AmountOverflow
        );
    }

    #[test]
    fn test_checked_arithmetic_overflow() {
        assert!(Money::from_micros(i64::MAX).checked_add(Money::from_micros(1)).is_none());
        assert!(Money::from_micros(i64::MAX).checked_mul(2).is_none());
    }

    #[test]
    fn test_serializes_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_micros(50_000_000)).unwrap();
        assert_eq!(json, "\"50.00\"");

        let back: Money = serde_json::from_str("\"10.05\"").unwrap();
        assert_eq!(back.micros(), 10_050_000);
    }

    #[test]
    fn test_decimal_conversion() {
        let amount = Decimal::new(1234, 2);
        let money = Money::try_from(amount).unwrap();
        assert_eq!(Decimal::from(money), Decimal::new(1234, 2));
    }
}
