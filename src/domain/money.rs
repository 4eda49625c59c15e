use crate::error::{CampaignError, GatewayError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Number of decimal places the payment processor's minor unit represents.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// A signed running total such as the amount raised by a campaign.
///
/// This is a wrapper around `rust_decimal::Decimal` to keep campaign totals
/// distinct from individual pledge amounts.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// A strictly positive monetary amount: a campaign goal, a pledge, a tier price.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, CampaignError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(CampaignError::BadRequest(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = CampaignError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Subtracts `amount`, flooring the result at zero.
    pub fn saturating_sub(self, amount: Balance) -> Self {
        Self((self.0 - amount.0).max(Decimal::ZERO))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// Converts a decimal currency value into the processor's integer minor units.
///
/// Rounds half away from zero to the nearest cent before scaling, so
/// `10.005` becomes `1001`. The scaling itself is exact in `Decimal`.
pub fn to_minor_units(value: Decimal) -> Result<i64, GatewayError> {
    let rounded = value.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    let scaled = rounded
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| GatewayError::InvalidAmount(format!("{value} overflows minor units")))?;
    scaled
        .to_i64()
        .ok_or_else(|| GatewayError::InvalidAmount(format!("{value} overflows minor units")))
}

/// Converts processor minor units back into a decimal currency value.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}
