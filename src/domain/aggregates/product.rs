//! Catalog shapes consumed at cart-add and checkout time.
//!
//! The catalog is owned elsewhere; these are the fields the pricing and
//! checkout paths read. Prices are plain decimals in the product's currency.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::value_objects::ParseEnumError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub name: String,
    pub image_url: Option<String>,
    pub base_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub currency: String,
    pub status: ProductStatus,
}

impl Product {
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "DRAFT",
            ProductStatus::Active => "ACTIVE",
            ProductStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

impl FromStr for ProductStatus {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(ProductStatus::Draft),
            "ACTIVE" => Ok(ProductStatus::Active),
            "ARCHIVED" => Ok(ProductStatus::Archived),
            other => Err(ParseEnumError { kind: "product status", value: other.to_string() }),
        }
    }
}

/// One sellable variation of a product. Variant prices, when present,
/// override the product's own prices.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub label: String,
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(status: ProductStatus) -> Product {
        Product {
            id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            vendor_name: "Acme".into(),
            name: "Widget".into(),
            image_url: None,
            base_price: Decimal::new(100, 0),
            sale_price: None,
            currency: "USD".into(),
            status,
        }
    }

    #[test]
    fn test_only_active_products_are_purchasable() {
        assert!(product(ProductStatus::Active).is_purchasable());
        assert!(!product(ProductStatus::Draft).is_purchasable());
        assert!(!product(ProductStatus::Archived).is_purchasable());
    }

    #[test]
    fn test_status_round_trip() {
        for s in [ProductStatus::Draft, ProductStatus::Active, ProductStatus::Archived] {
            assert_eq!(s.as_str().parse::<ProductStatus>().unwrap(), s);
        }
    }
}
