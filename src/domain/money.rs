use crate::error::{Result, SettlementError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Decimal places of the minor currency unit.
pub const MINOR_UNIT_DP: u32 = 2;

/// A monetary value in major currency units.
///
/// Wraps `rust_decimal::Decimal` so that rounding to the minor unit and the
/// conversion to gateway integer amounts happen in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Rounds half away from zero to the minor unit.
    pub fn round_minor(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(MINOR_UNIT_DP, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Amount in the smallest currency unit, as gateways expect it.
    pub fn to_minor_units(self) -> Result<i64> {
        self.round_minor()
            .0
            .checked_mul(Decimal::from(10_i64.pow(MINOR_UNIT_DP)))
            .and_then(|scaled| scaled.to_i64())
            .ok_or_else(|| SettlementError::InvalidInput(format!("amount {} out of range", self.0)))
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }

    /// Multiplies by a rate and rounds to the minor unit.
    pub fn times_rate(self, rate: Decimal) -> Self {
        Self(self.0 * rate).round_minor()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// A strictly positive price charged to the payer, at most [`Price::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Money);

impl Price {
    /// Largest amount a single checkout may charge.
    pub const MAX: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 2);

    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(SettlementError::InvalidInput(
                "amount must be positive".to_string(),
            ));
        }
        if value > Self::MAX {
            return Err(SettlementError::InvalidInput(format!(
                "amount {value} exceeds the maximum of {}",
                Self::MAX
            )));
        }
        let money = Money::new(value);
        if money.round_minor() != money {
            return Err(SettlementError::InvalidInput(format!(
                "amount {value} has more than {MINOR_UNIT_DP} decimal places"
            )));
        }
        Ok(Self(money))
    }

    pub fn money(&self) -> Money {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = SettlementError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0.value()
    }
}

/// ISO 4217 code, stored lowercase the way gateways echo it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl AsRef<str>) -> Result<Self> {
        let code = code.as_ref().trim().to_ascii_lowercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_lowercase()) {
            Ok(Self(code))
        } else {
            Err(SettlementError::Config(format!("invalid currency code '{code}'")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self("eur".to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = SettlementError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}
