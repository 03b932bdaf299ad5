use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ValueObject};

/// Unit price: positive, at most 8 integer and 2 fraction digits (NUMERIC(10,2)).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

const MAX_INTEGER_DIGITS: u32 = 8;
const MAX_FRACTION_DIGITS: u32 = 2;

impl Price {
    pub fn new(value: Decimal) -> DomainResult<Self> {
        match Self::problem(value) {
            None => Ok(Self(value)),
            Some(msg) => Err(DomainError::validation(msg)),
        }
    }

    /// What is wrong with `value` as a price, if anything.
    pub fn problem(value: Decimal) -> Option<&'static str> {
        if value <= Decimal::ZERO {
            return Some("price must be greater than 0");
        }
        if value.normalize().scale() > MAX_FRACTION_DIGITS {
            return Some("price must have at most 2 decimal places");
        }
        if value.trunc() >= Decimal::from(10_u64.pow(MAX_INTEGER_DIGITS)) {
            return Some("price must have at most 8 integer digits");
        }
        None
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl ValueObject for Price {}

impl TryFrom<Decimal> for Price {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Price::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn accepts_typical_prices() {
        assert_eq!(Price::new(d("9.99")).unwrap().amount(), d("9.99"));
        assert!(Price::new(d("0.01")).is_ok());
        assert!(Price::new(d("99999999.99")).is_ok());
        // trailing zeros do not count as precision
        assert!(Price::new(d("1.500")).is_ok());
    }

    #[test]
    fn rejects_non_positive() {
        assert!(Price::new(Decimal::ZERO).is_err());
        assert!(Price::new(d("-1")).is_err());
    }

    #[test]
    fn rejects_excess_precision_and_magnitude() {
        assert_eq!(Price::problem(d("1.999")), Some("price must have at most 2 decimal places"));
        assert_eq!(Price::problem(d("100000000")), Some("price must have at most 8 integer digits"));
    }

    #[test]
    fn serializes_as_decimal_string() {
        let price = Price::new(d("9.99")).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"9.99\"");
        let back: Price = serde_json::from_str("\"9.99\"").unwrap();
        assert_eq!(back, price);
        assert!(serde_json::from_str::<Price>("\"-3\"").is_err());
    }
}
