//! Price resolution.
//!
//! Resolves the single authoritative unit price for a product (and optional
//! variant). Pure; checkout calls this fresh against current catalog state
//! and never trusts a price snapshot taken at cart-add time.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::product::{Product, Variant};
use crate::domain::value_objects::Money;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("product unavailable: {product_id}")]
    ProductUnavailable { product_id: Uuid },

    #[error("variant unavailable: {variant_id}")]
    VariantUnavailable { variant_id: Uuid },
}

/// Precedence, first non-null wins:
/// variant sale price, variant price, product sale price, product base price.
pub fn resolve_unit_price(product: &Product, variant: Option<&Variant>) -> Result<Money, PricingError> {
    if !product.is_purchasable() {
        return Err(PricingError::ProductUnavailable { product_id: product.id });
    }
    let amount = match variant {
        Some(v) => {
            if v.product_id != product.id || !v.is_active {
                return Err(PricingError::VariantUnavailable { variant_id: v.id });
            }
            v.sale_price
                .or(v.price)
                .or(product.sale_price)
                .unwrap_or(product.base_price)
        }
        None => product.sale_price.unwrap_or(product.base_price),
    };
    Ok(Money::new(amount, &product.currency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::ProductStatus;
    use rust_decimal::Decimal;

    fn product() -> Product {
        Product {
            id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            vendor_name: "Acme".into(),
            name: "Widget".into(),
            image_url: None,
            base_price: Decimal::new(100, 0),
            sale_price: Some(Decimal::new(80, 0)),
            currency: "USD".into(),
            status: ProductStatus::Active,
        }
    }

    fn variant(product: &Product) -> Variant {
        Variant {
            id: Uuid::new_v4(),
            product_id: product.id,
            label: "Large".into(),
            price: Some(Decimal::new(90, 0)),
            sale_price: None,
            is_active: true,
        }
    }

    #[test]
    fn test_variant_price_beats_product_sale_price() {
        let p = product();
        let v = variant(&p);
        let price = resolve_unit_price(&p, Some(&v)).unwrap();
        assert_eq!(price.amount(), Decimal::new(90, 0));
    }

    #[test]
    fn test_variant_sale_price_wins_over_everything() {
        let p = product();
        let mut v = variant(&p);
        v.sale_price = Some(Decimal::new(70, 0));
        let price = resolve_unit_price(&p, Some(&v)).unwrap();
        assert_eq!(price.amount(), Decimal::new(70, 0));
    }

    #[test]
    fn test_priceless_variant_falls_back_to_product_sale_price() {
        let p = product();
        let mut v = variant(&p);
        v.price = None;
        let price = resolve_unit_price(&p, Some(&v)).unwrap();
        assert_eq!(price.amount(), Decimal::new(80, 0));
    }

    #[test]
    fn test_base_price_is_the_last_resort() {
        let mut p = product();
        p.sale_price = None;
        let price = resolve_unit_price(&p, None).unwrap();
        assert_eq!(price.amount(), Decimal::new(100, 0));
        assert_eq!(price.currency(), "USD");
    }

    #[test]
    fn test_product_sale_price_without_variant() {
        let p = product();
        let price = resolve_unit_price(&p, None).unwrap();
        assert_eq!(price.amount(), Decimal::new(80, 0));
    }

    #[test]
    fn test_inactive_product_is_unpurchasable() {
        for status in [ProductStatus::Draft, ProductStatus::Archived] {
            let mut p = product();
            p.status = status;
            let err = resolve_unit_price(&p, None).unwrap_err();
            assert_eq!(err, PricingError::ProductUnavailable { product_id: p.id });
        }
    }

    #[test]
    fn test_inactive_variant_is_rejected() {
        let p = product();
        let mut v = variant(&p);
        v.is_active = false;
        let err = resolve_unit_price(&p, Some(&v)).unwrap_err();
        assert_eq!(err, PricingError::VariantUnavailable { variant_id: v.id });
    }

    #[test]
    fn test_variant_of_another_product_is_rejected() {
        let p = product();
        let mut v = variant(&p);
        v.product_id = Uuid::new_v4();
        assert!(matches!(
            resolve_unit_price(&p, Some(&v)),
            Err(PricingError::VariantUnavailable { .. })
        ));
    }
}
