//! Fulfillment: advancing orders and vendor orders through their lifecycle.
//!
//! Every accepted transition persists the new status together with one
//! appended tracking event; a rejected transition writes nothing.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::checkout::publish;
use crate::domain::aggregates::order::{Order, OrderStatus, TransitionError};
use crate::domain::aggregates::vendor_order::VendorOrder;
use crate::domain::events::{OrderEvent, TrackingEvent};
use crate::store::{CommerceStore, StoreError};

#[derive(Clone, Debug, Deserialize)]
pub struct StatusUpdate {
    pub new_status: OrderStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
}

impl StatusUpdate {
    pub fn to(new_status: OrderStatus) -> Self {
        Self { new_status, description: None, location: None, carrier: None, tracking_number: None }
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }

    pub fn with_tracking_number(mut self, number: impl Into<String>) -> Self {
        self.tracking_number = Some(number.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("vendor order not found: {0}")]
    VendorOrderNotFound(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, FulfillmentError::Store(_))
    }
}

pub struct FulfillmentService<S> {
    store: Arc<S>,
    publisher: Option<async_nats::Client>,
}

impl<S: CommerceStore> FulfillmentService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store, publisher: None }
    }

    pub fn with_publisher(mut self, publisher: Option<async_nats::Client>) -> Self {
        self.publisher = publisher;
        self
    }

    pub async fn advance_order(&self, order_id: Uuid, update: StatusUpdate) -> Result<Order, FulfillmentError> {
        let mut order = self
            .store
            .order(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        let from = order.status;
        if update.new_status == OrderStatus::Refunded {
            order.refund()?;
        } else {
            order.transition_to(update.new_status)?;
        }

        let event = tracking_event(TrackingEvent::for_order(order_id, order.status), &update);
        self.store.save_order_status(&order, event).await?;

        publish(
            &self.publisher,
            OrderEvent::StatusChanged { order_id, vendor_order_id: None, from, to: order.status },
        )
        .await;
        Ok(order)
    }

    pub async fn advance_vendor_order(
        &self,
        vendor_order_id: Uuid,
        update: StatusUpdate,
    ) -> Result<VendorOrder, FulfillmentError> {
        let mut vendor_order = self
            .store
            .vendor_order(vendor_order_id)
            .await?
            .ok_or(FulfillmentError::VendorOrderNotFound(vendor_order_id))?;
        let from = vendor_order.status;
        vendor_order.transition_to(update.new_status)?;

        let event = tracking_event(
            TrackingEvent::for_vendor_order(vendor_order.order_id, vendor_order_id, vendor_order.status),
            &update,
        );
        self.store.save_vendor_order_status(&vendor_order, event).await?;

        publish(
            &self.publisher,
            OrderEvent::StatusChanged {
                order_id: vendor_order.order_id,
                vendor_order_id: Some(vendor_order_id),
                from,
                to: vendor_order.status,
            },
        )
        .await;
        Ok(vendor_order)
    }

    /// Payment settles outside the fulfillment table; the appended event
    /// keeps the narration complete without advancing the status.
    pub async fn mark_order_paid(&self, order_id: Uuid) -> Result<Order, FulfillmentError> {
        let mut order = self
            .store
            .order(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        order.mark_paid();
        let event = TrackingEvent::for_order(order_id, order.status).with_description("Payment received");
        self.store.save_order_status(&order, event).await?;
        Ok(order)
    }

    /// Buyer-facing timeline: tracking events ascending by occurrence time.
    pub async fn timeline(&self, order_id: Uuid) -> Result<Vec<TrackingEvent>, FulfillmentError> {
        if self.store.order(order_id).await?.is_none() {
            return Err(FulfillmentError::OrderNotFound(order_id));
        }
        Ok(self.store.timeline(order_id).await?)
    }
}

fn tracking_event(base: TrackingEvent, update: &StatusUpdate) -> TrackingEvent {
    let mut event = base;
    event.description = update.description.clone();
    event.location = update.location.clone();
    event.carrier = update.carrier.clone();
    event.tracking_number = update.tracking_number.clone();
    event
}
