//! Checkout transactor.
//!
//! Turns a validated checkout request into one durable platform order plus
//! per-vendor sub-orders. Prices are re-resolved against current catalog
//! state; the client-submitted cart carries quantities and identity only.
//! The write phase is a single atomic store call, so a failed attempt leaves
//! no order, item, or address rows behind.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::order::{
    Order, OrderItem, OrderStatus, PaymentStatus, PAYMENT_METHOD_COD,
};
use crate::domain::aggregates::user::{Actor, Address, User};
use crate::domain::aggregates::vendor_order::VendorOrder;
use crate::domain::events::{OrderEvent, TrackingEvent};
use crate::domain::value_objects::PurchaseType;
use crate::pricing::{resolve_unit_price, PricingError};
use crate::store::{CheckoutWrite, CommerceStore, StoreError, UserWrite};

/// Platform-level knobs the transactor needs.
#[derive(Clone, Debug)]
pub struct CommerceSettings {
    pub commission_rate: Decimal,
    pub currency: String,
}

impl Default for CommerceSettings {
    fn default() -> Self {
        Self { commission_rate: Decimal::new(10, 2), currency: "USD".to_string() }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub full_name: String,
    pub phone: Option<String>,
    #[validate(length(min = 1))]
    pub street: String,
    #[validate(length(min = 1))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub postal_code: String,
    #[validate(length(min = 1))]
    pub country: String,
    pub items: Vec<CheckoutLine>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: u32,
    #[serde(default)]
    pub purchase_type: PurchaseType,
}

/// Receipt for a committed checkout.
#[derive(Clone, Debug, Serialize)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub order_number: String,
    pub total: Decimal,
    pub currency: String,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid checkout request: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("invalid cart contents: {detail}")]
    InvalidCartContents { detail: String },

    #[error(transparent)]
    Unavailable(#[from] PricingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Fatal errors abort the request as an infrastructure failure; the rest
    /// are business outcomes reported as `ok: false` at the boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CheckoutError::Store(_))
    }
}

pub struct CheckoutService<S> {
    store: Arc<S>,
    settings: CommerceSettings,
    publisher: Option<async_nats::Client>,
}

impl<S: CommerceStore> CheckoutService<S> {
    pub fn new(store: Arc<S>, settings: CommerceSettings) -> Self {
        Self { store, settings, publisher: None }
    }

    pub fn with_publisher(mut self, publisher: Option<async_nats::Client>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Places one order for the given actor. Everything up to the store
    /// commit is read-only; everything after it is best-effort.
    pub async fn place_order(&self, actor: &Actor, req: &CheckoutRequest) -> Result<PlacedOrder, CheckoutError> {
        req.validate()?;
        if req.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // One batched fetch per kind, concurrently; the write phase below is
        // strictly sequential.
        let mut product_ids: Vec<Uuid> = req.items.iter().map(|l| l.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let mut variant_ids: Vec<Uuid> = req.items.iter().filter_map(|l| l.variant_id).collect();
        variant_ids.sort_unstable();
        variant_ids.dedup();

        let (products, variants) = tokio::join!(
            self.store.products_by_ids(&product_ids),
            self.store.variants_by_ids(&variant_ids),
        );
        let products: HashMap<Uuid, _> = products?.into_iter().map(|p| (p.id, p)).collect();
        let variants: HashMap<Uuid, _> = variants?.into_iter().map(|v| (v.id, v)).collect();

        // Re-resolve every line's price; any invalid line rejects the whole
        // attempt before anything is written.
        let mut priced = Vec::with_capacity(req.items.len());
        for line in &req.items {
            let product = products.get(&line.product_id).ok_or_else(|| CheckoutError::InvalidCartContents {
                detail: format!("unknown product {}", line.product_id),
            })?;
            if line.quantity < 1 {
                return Err(CheckoutError::InvalidCartContents {
                    detail: format!("quantity for {} must be at least 1", product.name),
                });
            }
            let variant = match line.variant_id {
                Some(variant_id) => Some(variants.get(&variant_id).ok_or_else(|| {
                    CheckoutError::InvalidCartContents { detail: format!("unknown variant {variant_id}") }
                })?),
                None => None,
            };
            let unit = resolve_unit_price(product, variant)?;
            if unit.currency() != self.settings.currency {
                return Err(CheckoutError::InvalidCartContents {
                    detail: format!("{} is not priced in {}", product.name, self.settings.currency),
                });
            }
            priced.push((line, product, unit.amount()));
        }

        let subtotal: Decimal = priced
            .iter()
            .map(|(line, _, unit)| *unit * Decimal::from(line.quantity))
            .sum();
        let shipping = Decimal::ZERO;
        let tax = Decimal::ZERO;
        let discount = Decimal::ZERO;
        let total = subtotal + shipping + tax - discount;

        let user_write = match actor {
            Actor::Authenticated { id, .. } => UserWrite::Reuse(*id),
            Actor::Guest => match self.store.user_by_email(&req.email).await? {
                Some(user) => UserWrite::Reuse(user.id),
                None => UserWrite::Create(User::materialize_guest(
                    req.email.clone(),
                    req.full_name.clone(),
                    req.phone.clone(),
                )),
            },
        };
        let user_id = user_write.user_id();

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = format!("ORD-{:08}", rand::random::<u32>());

        // Per-vendor partitions; BTreeMap keeps the split deterministic.
        let mut by_vendor: BTreeMap<Uuid, (String, Decimal)> = BTreeMap::new();
        for (line, product, unit) in &priced {
            let entry = by_vendor
                .entry(product.vendor_id)
                .or_insert_with(|| (product.vendor_name.clone(), Decimal::ZERO));
            entry.1 += *unit * Decimal::from(line.quantity);
        }
        let vendor_orders: Vec<VendorOrder> = by_vendor
            .into_iter()
            .map(|(vendor_id, (vendor_name, vendor_subtotal))| {
                VendorOrder::new(
                    order_id,
                    vendor_id,
                    vendor_name,
                    vendor_subtotal,
                    self.settings.commission_rate,
                    &self.settings.currency,
                )
            })
            .collect();
        let vendor_order_ids: HashMap<Uuid, Uuid> =
            vendor_orders.iter().map(|vo| (vo.vendor_id, vo.id)).collect();

        let items: Vec<OrderItem> = priced
            .iter()
            .map(|(line, product, unit)| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                vendor_order_id: vendor_order_ids[&product.vendor_id],
                product_id: line.product_id,
                variant_id: line.variant_id,
                purchase_type: line.purchase_type,
                name: product.name.clone(),
                quantity: line.quantity,
                price_per_unit: *unit,
                total_price: *unit * Decimal::from(line.quantity),
            })
            .collect();

        let address = Address {
            id: Uuid::new_v4(),
            user_id,
            full_name: req.full_name.clone(),
            phone: req.phone.clone(),
            street: req.street.clone(),
            city: req.city.clone(),
            state: req.state.clone(),
            postal_code: req.postal_code.clone(),
            country: req.country.clone(),
            is_default: true,
            created_at: now,
        };
        let address_id = address.id;

        let order = Order {
            id: order_id,
            order_number: order_number.clone(),
            user_id,
            email: req.email.clone(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PAYMENT_METHOD_COD.to_string(),
            currency: self.settings.currency.clone(),
            subtotal,
            shipping,
            tax,
            discount,
            total,
            ship_name: req.full_name.clone(),
            ship_phone: req.phone.clone(),
            ship_street: req.street.clone(),
            ship_city: req.city.clone(),
            ship_state: req.state.clone(),
            ship_postal_code: req.postal_code.clone(),
            ship_country: req.country.clone(),
            created_at: now,
            updated_at: now,
        };

        self.store
            .commit_checkout(CheckoutWrite {
                user: user_write,
                address,
                order,
                items,
                vendor_orders,
                initial_event: TrackingEvent::for_order(order_id, OrderStatus::Pending)
                    .with_description("Order placed"),
                clear_cart_for: actor.user_id(),
            })
            .await?;

        // Best-effort tail: convenience updates only, each failure logged and
        // swallowed. The committed order does not depend on any of them.
        if let Err(e) = self.store.demote_other_defaults(user_id, address_id).await {
            tracing::warn!(error = %e, %user_id, "failed to demote previous default addresses");
        }
        if let Actor::Authenticated { id, .. } = actor {
            if let Err(e) = self
                .store
                .touch_user_contact(*id, &req.full_name, req.phone.as_deref())
                .await
            {
                tracing::warn!(error = %e, user_id = %id, "failed to refresh user contact details");
            }
        }
        publish(
            &self.publisher,
            OrderEvent::Placed {
                order_id,
                order_number: order_number.clone(),
                user_id,
                total,
                currency: self.settings.currency.clone(),
            },
        )
        .await;

        Ok(PlacedOrder {
            order_id,
            order_number,
            total,
            currency: self.settings.currency.clone(),
        })
    }
}

/// Fire-and-forget publish; a bus failure is logged, never surfaced.
pub(crate) async fn publish(publisher: &Option<async_nats::Client>, event: OrderEvent) {
    let Some(client) = publisher else { return };
    match serde_json::to_vec(&event) {
        Ok(payload) => {
            if let Err(e) = client.publish(event.subject(), payload.into()).await {
                tracing::warn!(error = %e, "failed to publish order event");
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to encode order event"),
    }
}
