//! Rupee amounts with decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(12, 2)` and travel over JSON as plain
//! numbers. Deserialisation also accepts numeric strings, which is what
//! multipart forms and some clients send.

use core::fmt;
use core::iter::Sum;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The input is not a number.
    #[error("price must be a number")]
    NotANumber,
    /// The amount does not fit a price column.
    #[error("price cannot exceed {}", Price::MAX)]
    TooLarge,
}

/// A non-negative amount in Indian rupees, rounded to paise.
///
/// Every value fits `NUMERIC(12, 2)`, so arithmetic is checked against
/// [`Price::MAX`] rather than left to panic on decimal overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount a `NUMERIC(12, 2)` column holds.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2)); // 9_999_999_999.99

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero and
    /// [`PriceError::TooLarge`] above [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        let amount = amount.round_dp(2);
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Create a price from whole rupees.
    #[must_use]
    pub fn from_rupees(rupees: u32) -> Self {
        Self(Decimal::from(rupees))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::TooLarge`] when the line total overflows.
    pub fn times(self, quantity: u32) -> Result<Self, PriceError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .ok_or(PriceError::TooLarge)
            .and_then(Self::new)
    }

    /// Add two prices.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::TooLarge`] when the sum overflows.
    pub fn checked_add(self, rhs: Self) -> Result<Self, PriceError> {
        self.0
            .checked_add(rhs.0)
            .ok_or(PriceError::TooLarge)
            .and_then(Self::new)
    }

    /// Percentage saved relative to an original (list) price, rounded down.
    #[must_use]
    pub fn discount_percent(self, original: Self) -> u32 {
        if original.0 <= self.0 || original.0.is_zero() {
            return 0;
        }
        let pct = (original.0 - self.0) * Decimal::ONE_HUNDRED / original.0;
        pct.floor().to_u32().unwrap_or(0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }
}

impl TryFrom<f64> for Price {
    type Error = PriceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let amount = Decimal::from_f64(value).ok_or(PriceError::NotANumber)?;
        Self::new(amount)
    }
}

impl Sum<Price> for Result<Price, PriceError> {
    fn sum<I: Iterator<Item = Price>>(mut iter: I) -> Self {
        iter.try_fold(Price::ZERO, Price::checked_add)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0.to_f64().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self::try_from(n),
            Raw::Text(s) => s.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Price::new(Decimal::new(-1, 0)), Err(PriceError::Negative));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_rounds_to_paise() {
        let price: Price = "1999.999".parse().unwrap();
        assert_eq!(price.amount(), Decimal::new(200_000, 2));
    }

    #[test]
    fn test_line_totals_and_sum() {
        let total: Result<Price, PriceError> = [
            Price::from_rupees(2500).times(2).unwrap(),
            Price::from_rupees(800),
            "99.50".parse().unwrap(),
        ]
        .into_iter()
        .sum();
        assert_eq!(total.unwrap().amount(), Decimal::new(589_950, 2));
    }

    #[test]
    fn test_max_fits_price_column() {
        assert_eq!(Price::MAX.amount(), Decimal::new(999_999_999_999, 2));
        assert_eq!(Price::MAX.to_string(), "₹9999999999.99");
    }

    #[test]
    fn test_rejects_amounts_beyond_column() {
        assert_eq!("10000000000".parse::<Price>(), Err(PriceError::TooLarge));
        assert!(serde_json::from_str::<Price>("1e28").is_err());
        assert!(serde_json::from_str::<Price>("1e30").is_err());
    }

    #[test]
    fn test_arithmetic_overflow_is_an_error() {
        assert_eq!(Price::MAX.times(10), Err(PriceError::TooLarge));
        assert_eq!(
            Price::MAX.checked_add(Price::from_rupees(1)),
            Err(PriceError::TooLarge)
        );
        assert_eq!(Price::MAX.times(1), Ok(Price::MAX));

        let total: Result<Price, PriceError> = [Price::MAX, Price::MAX].into_iter().sum();
        assert_eq!(total, Err(PriceError::TooLarge));
    }

    #[test]
    fn test_discount_percent() {
        let price = Price::from_rupees(2500);
        assert_eq!(price.discount_percent(Price::from_rupees(3000)), 16);
        assert_eq!(price.discount_percent(Price::from_rupees(2000)), 0);
        assert_eq!(price.discount_percent(Price::ZERO), 0);
    }

    #[test]
    fn test_json_accepts_numbers_and_strings() {
        let from_number: Price = serde_json::from_str("2500").unwrap();
        let from_text: Price = serde_json::from_str("\"2500.00\"").unwrap();
        assert_eq!(from_number, from_text);
        assert!(serde_json::from_str::<Price>("-5").is_err());
        assert!(serde_json::from_str::<Price>("\"abc\"").is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_value(Price::from_rupees(800)).unwrap();
        assert_eq!(json, serde_json::json!(800.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_rupees(800).to_string(), "₹800.00");
    }
}
