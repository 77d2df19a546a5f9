//! Order aggregate and its fulfillment state machine.
//!
//! State transitions:
//! ```text
//! Pending ──► Confirmed ──► Processing ──► Shipped ──► Delivered
//!    │            │              │            │
//!    └────────────┴──────────────┴────────────┴──► Cancelled
//! ```
//! `Delivered`, `Cancelled` and `Refunded` are terminal. Refund is not a row
//! of the table: it is a separate operation legal only for a delivered, paid
//! order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{ParseEnumError, PurchaseType};

/// The only payment method currently wired; a placeholder until a gateway
/// integration lands.
pub const PAYMENT_METHOD_COD: &str = "CASH_ON_DELIVERY";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// The transition table. Anything not listed here is illegal.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Processing, OrderStatus::Cancelled],
            OrderStatus::Processing => &[OrderStatus::Shipped, OrderStatus::Cancelled],
            OrderStatus::Shipped => &[OrderStatus::Delivered, OrderStatus::Cancelled],
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "REFUNDED" => Ok(OrderStatus::Refunded),
            other => Err(ParseEnumError { kind: "order status", value: other.to_string() }),
        }
    }
}

/// Payment lifecycle. Deliberately not coupled to the fulfillment table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::PartiallyRefunded => "PARTIALLY_REFUNDED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            "PARTIALLY_REFUNDED" => Ok(PaymentStatus::PartiallyRefunded),
            other => Err(ParseEnumError { kind: "payment status", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("refund requires a delivered, paid order (status {status}, payment {payment})")]
    RefundUnavailable { status: OrderStatus, payment: PaymentStatus },
}

/// Buyer-facing aggregate root for one checkout. Immutable after placement
/// except for its two status fields; the address is an inline snapshot, not
/// a reference to a live row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub currency: String,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub ship_name: String,
    pub ship_phone: Option<String>,
    pub ship_street: String,
    pub ship_city: String,
    pub ship_state: Option<String>,
    pub ship_postal_code: String,
    pub ship_country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Validates against the transition table; an illegal attempt leaves the
    /// order untouched.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::IllegalTransition { from: self.status, to: next });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Refund path, outside the fulfillment table: only a delivered, paid
    /// order can be refunded. Moves both status fields to `Refunded`.
    pub fn refund(&mut self) -> Result<(), TransitionError> {
        if self.status != OrderStatus::Delivered || self.payment_status != PaymentStatus::Paid {
            return Err(TransitionError::RefundUnavailable {
                status: self.status,
                payment: self.payment_status,
            });
        }
        self.status = OrderStatus::Refunded;
        self.payment_status = PaymentStatus::Refunded;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_paid(&mut self) {
        self.payment_status = PaymentStatus::Paid;
        self.updated_at = Utc::now();
    }
}

/// Immutable snapshot of one purchased line, priced at placement time.
/// Never recomputed, even if catalog prices change later.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub purchase_type: PurchaseType,
    pub name: String,
    pub quantity: u32,
    pub price_per_unit: Decimal,
    pub total_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, payment: PaymentStatus) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            order_number: "ORD-00000001".into(),
            user_id: Uuid::new_v4(),
            email: "buyer@example.com".into(),
            status,
            payment_status: payment,
            payment_method: PAYMENT_METHOD_COD.into(),
            currency: "USD".into(),
            subtotal: Decimal::new(100, 0),
            shipping: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::new(100, 0),
            ship_name: "A Buyer".into(),
            ship_phone: None,
            ship_street: "1 Main St".into(),
            ship_city: "Springfield".into(),
            ship_state: None,
            ship_postal_code: "12345".into(),
            ship_country: "US".into(),
            created_at: now,
            updated_at: now,
        }
    }

    const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    #[test]
    fn test_transition_table_is_exact() {
        let legal = [
            (OrderStatus::Pending, OrderStatus::Confirmed),
            (OrderStatus::Pending, OrderStatus::Cancelled),
            (OrderStatus::Confirmed, OrderStatus::Processing),
            (OrderStatus::Confirmed, OrderStatus::Cancelled),
            (OrderStatus::Processing, OrderStatus::Shipped),
            (OrderStatus::Processing, OrderStatus::Cancelled),
            (OrderStatus::Shipped, OrderStatus::Delivered),
            (OrderStatus::Shipped, OrderStatus::Cancelled),
        ];
        for from in ALL {
            for to in ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(from.can_transition_to(to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_happy_path_walk() {
        let mut o = order(OrderStatus::Pending, PaymentStatus::Pending);
        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            o.transition_to(next).unwrap();
            assert_eq!(o.status, next);
        }
    }

    #[test]
    fn test_illegal_transition_leaves_status_unchanged() {
        let mut o = order(OrderStatus::Shipped, PaymentStatus::Pending);
        let err = o.transition_to(OrderStatus::Pending).unwrap_err();
        assert_eq!(
            err,
            TransitionError::IllegalTransition { from: OrderStatus::Shipped, to: OrderStatus::Pending }
        );
        assert_eq!(o.status, OrderStatus::Shipped);
    }

    #[test]
    fn test_no_transition_out_of_terminal_states() {
        for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled, OrderStatus::Refunded] {
            for to in ALL {
                let mut o = order(terminal, PaymentStatus::Pending);
                assert!(o.transition_to(to).is_err(), "{terminal} -> {to} should be rejected");
                assert_eq!(o.status, terminal);
            }
        }
    }

    #[test]
    fn test_cancel_reachable_from_every_pre_delivery_state() {
        for from in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
        ] {
            let mut o = order(from, PaymentStatus::Pending);
            o.transition_to(OrderStatus::Cancelled).unwrap();
            assert_eq!(o.status, OrderStatus::Cancelled);
        }
    }

    #[test]
    fn test_refund_requires_delivered_and_paid() {
        let mut unpaid = order(OrderStatus::Delivered, PaymentStatus::Pending);
        assert!(unpaid.refund().is_err());
        assert_eq!(unpaid.status, OrderStatus::Delivered);

        let mut undelivered = order(OrderStatus::Shipped, PaymentStatus::Paid);
        assert!(undelivered.refund().is_err());

        let mut ok = order(OrderStatus::Delivered, PaymentStatus::Paid);
        ok.refund().unwrap();
        assert_eq!(ok.status, OrderStatus::Refunded);
        assert_eq!(ok.payment_status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_status_round_trip() {
        for s in ALL {
            assert_eq!(s.as_str().parse::<OrderStatus>().unwrap(), s);
        }
        assert!("UNKNOWN".parse::<OrderStatus>().is_err());
    }
}
