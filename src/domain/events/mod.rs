//! Domain events and the fulfillment tracking ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::order::OrderStatus;

/// One immutable entry in an order's shipment narration. Appended on status
/// changes that carry operational detail; never mutated or deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub order_id: Uuid,
    pub vendor_order_id: Option<Uuid>,
    pub status: OrderStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TrackingEvent {
    pub fn for_order(order_id: Uuid, status: OrderStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            vendor_order_id: None,
            status,
            description: None,
            location: None,
            carrier: None,
            tracking_number: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn for_vendor_order(order_id: Uuid, vendor_order_id: Uuid, status: OrderStatus) -> Self {
        let mut event = Self::for_order(order_id, status);
        event.vendor_order_id = Some(vendor_order_id);
        event
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }

    pub fn with_tracking_number(mut self, number: impl Into<String>) -> Self {
        self.tracking_number = Some(number.into());
        self
    }

    /// Buyer-facing timeline order: ascending occurrence time, independent
    /// of insertion order.
    pub fn sort_timeline(events: &mut [TrackingEvent]) {
        events.sort_by_key(|e| e.occurred_at);
    }
}

/// Facts published to the message bus after a commit. Publishing is
/// best-effort; a publish failure never fails the operation that raised it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed {
        order_id: Uuid,
        order_number: String,
        user_id: Uuid,
        total: Decimal,
        currency: String,
    },
    StatusChanged {
        order_id: Uuid,
        vendor_order_id: Option<Uuid>,
        from: OrderStatus,
        to: OrderStatus,
    },
}

impl OrderEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            OrderEvent::Placed { .. } => "vendora.orders.placed",
            OrderEvent::StatusChanged { .. } => "vendora.orders.status",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_timeline_sorts_by_occurrence_not_insertion() {
        let order_id = Uuid::new_v4();
        let base = Utc::now();
        let mut late = TrackingEvent::for_order(order_id, OrderStatus::Shipped);
        late.occurred_at = base + Duration::hours(2);
        let mut early = TrackingEvent::for_order(order_id, OrderStatus::Pending);
        early.occurred_at = base;
        let mut middle = TrackingEvent::for_order(order_id, OrderStatus::Confirmed);
        middle.occurred_at = base + Duration::hours(1);

        let mut events = vec![late, early, middle];
        TrackingEvent::sort_timeline(&mut events);
        let statuses: Vec<OrderStatus> = events.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Shipped]
        );
    }

    #[test]
    fn test_event_builders_carry_operational_detail() {
        let e = TrackingEvent::for_order(Uuid::new_v4(), OrderStatus::Shipped)
            .with_carrier("DHL")
            .with_tracking_number("JD014600003RU")
            .with_description("Handed to carrier");
        assert_eq!(e.carrier.as_deref(), Some("DHL"));
        assert_eq!(e.tracking_number.as_deref(), Some("JD014600003RU"));
        assert!(e.vendor_order_id.is_none());
    }
}
