//! Vendor order: one vendor's partition of a platform order.
//!
//! Each vendor order runs the same fulfillment table as the parent order but
//! advances independently. The platform order's status is a coarser view and
//! is not derived from its vendor orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::order::{OrderStatus, TransitionError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VendorOrder {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub currency: String,
    pub subtotal: Decimal,
    pub commission: Decimal,
    pub earnings: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VendorOrder {
    /// Commission is taken off the vendor's subtotal at the platform rate;
    /// what remains is the vendor's earnings.
    pub fn new(
        order_id: Uuid,
        vendor_id: Uuid,
        vendor_name: impl Into<String>,
        subtotal: Decimal,
        commission_rate: Decimal,
        currency: &str,
    ) -> Self {
        let commission = (subtotal * commission_rate).round_dp(2);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            vendor_id,
            vendor_name: vendor_name.into(),
            currency: currency.to_string(),
            subtotal,
            commission,
            earnings: subtotal - commission,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::IllegalTransition { from: self.status, to: next });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_split() {
        let vo = VendorOrder::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Acme",
            Decimal::new(200, 0),
            Decimal::new(10, 2), // 10%
            "USD",
        );
        assert_eq!(vo.commission, Decimal::new(2000, 2));
        assert_eq!(vo.earnings, Decimal::new(18000, 2));
        assert_eq!(vo.status, OrderStatus::Pending);
    }

    #[test]
    fn test_vendor_order_lifecycle_is_independent() {
        let mut vo = VendorOrder::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Acme",
            Decimal::new(50, 0),
            Decimal::ZERO,
            "USD",
        );
        vo.transition_to(OrderStatus::Confirmed).unwrap();
        vo.transition_to(OrderStatus::Processing).unwrap();
        vo.transition_to(OrderStatus::Shipped).unwrap();
        vo.transition_to(OrderStatus::Delivered).unwrap();
        assert!(vo.transition_to(OrderStatus::Cancelled).is_err());
        assert_eq!(vo.status, OrderStatus::Delivered);
    }
}
