//! Value objects for the storefront domain.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self { amount, currency: currency.to_string() }
    }
    pub fn usd(amount: Decimal) -> Self { Self::new(amount, "USD") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero("USD") } }

#[derive(Debug, Clone, Error)]
pub enum MoneyError {
    #[error("currency mismatch")]
    CurrencyMismatch,
}

/// Commercial mode of acquisition for a cart line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseType {
    #[default]
    New,
    Refurbished,
    Rental,
    Installment,
    PreOrder,
}

impl PurchaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseType::New => "NEW",
            PurchaseType::Refurbished => "REFURBISHED",
            PurchaseType::Rental => "RENTAL",
            PurchaseType::Installment => "INSTALLMENT",
            PurchaseType::PreOrder => "PRE_ORDER",
        }
    }
}

impl fmt::Display for PurchaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

impl FromStr for PurchaseType {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(PurchaseType::New),
            "REFURBISHED" => Ok(PurchaseType::Refurbished),
            "RENTAL" => Ok(PurchaseType::Rental),
            "INSTALLMENT" => Ok(PurchaseType::Installment),
            "PRE_ORDER" => Ok(PurchaseType::PreOrder),
            other => Err(ParseEnumError { kind: "purchase type", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Identity of one cart line. Two lines with the same key are the same line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[serde(default)]
    pub purchase_type: PurchaseType,
}

impl LineKey {
    pub fn new(product_id: Uuid, variant_id: Option<Uuid>, purchase_type: PurchaseType) -> Self {
        Self { product_id, variant_id, purchase_type }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_add() {
        let a = Money::usd(Decimal::new(100, 0));
        let b = Money::usd(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
    }

    #[test]
    fn test_money_add_rejects_mixed_currencies() {
        let a = Money::usd(Decimal::new(100, 0));
        let b = Money::new(Decimal::new(50, 0), "EUR");
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn test_money_multiply() {
        let unit = Money::usd(Decimal::new(1250, 2));
        assert_eq!(unit.multiply(3).amount(), Decimal::new(3750, 2));
    }

    #[test]
    fn test_line_key_equality() {
        let product = Uuid::new_v4();
        let variant = Uuid::new_v4();
        let a = LineKey::new(product, Some(variant), PurchaseType::New);
        let b = LineKey::new(product, Some(variant), PurchaseType::New);
        assert_eq!(a, b);
        assert_ne!(a, LineKey::new(product, None, PurchaseType::New));
        assert_ne!(a, LineKey::new(product, Some(variant), PurchaseType::Refurbished));
    }

    #[test]
    fn test_purchase_type_round_trip() {
        for pt in [
            PurchaseType::New,
            PurchaseType::Refurbished,
            PurchaseType::Rental,
            PurchaseType::Installment,
            PurchaseType::PreOrder,
        ] {
            assert_eq!(pt.as_str().parse::<PurchaseType>().unwrap(), pt);
        }
        assert!("USED".parse::<PurchaseType>().is_err());
    }
}
