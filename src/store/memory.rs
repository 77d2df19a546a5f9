//! In-memory store implementation for tests.
//!
//! Same interface as the PostgreSQL implementation; the checkout write runs
//! inside one write-lock scope, which gives it the same all-or-nothing
//! behavior the Postgres transaction gives.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::aggregates::cart::CartLine;
use crate::domain::aggregates::order::{Order, OrderItem};
use crate::domain::aggregates::product::{Product, Variant};
use crate::domain::aggregates::user::{Address, User};
use crate::domain::aggregates::vendor_order::VendorOrder;
use crate::domain::events::TrackingEvent;
use crate::domain::value_objects::LineKey;

use super::{CheckoutWrite, CommerceStore, StoreError, UserWrite};

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<State>>,
}

#[derive(Default)]
struct State {
    products: HashMap<Uuid, Product>,
    variants: HashMap<Uuid, Variant>,
    users: HashMap<Uuid, User>,
    addresses: Vec<Address>,
    cart_lines: HashMap<Uuid, Vec<CartLine>>,
    orders: HashMap<Uuid, Order>,
    order_items: HashMap<Uuid, Vec<OrderItem>>,
    vendor_orders: HashMap<Uuid, VendorOrder>,
    tracking_events: Vec<TrackingEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_product(&self, product: Product) {
        self.inner.write().await.products.insert(product.id, product);
    }

    pub async fn seed_variant(&self, variant: Variant) {
        self.inner.write().await.variants.insert(variant.id, variant);
    }

    pub async fn seed_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id, user);
    }

    /// Catalog edit hook for tests; placed orders must not observe it.
    pub async fn set_product_prices(&self, product_id: Uuid, base: Decimal, sale: Option<Decimal>) {
        if let Some(p) = self.inner.write().await.products.get_mut(&product_id) {
            p.base_price = base;
            p.sale_price = sale;
        }
    }

    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn user_count(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn address_count(&self) -> usize {
        self.inner.read().await.addresses.len()
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        let state = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }

    async fn variants_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Variant>, StoreError> {
        let state = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| state.variants.get(id).cloned()).collect())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.inner.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn touch_user_contact(&self, user_id: Uuid, full_name: &str, phone: Option<&str>) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::NotFound { entity: "user", id: user_id })?;
        user.full_name = full_name.to_string();
        if let Some(phone) = phone {
            user.phone = Some(phone.to_string());
        }
        Ok(())
    }

    async fn demote_other_defaults(&self, user_id: Uuid, keep: Uuid) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        for address in state.addresses.iter_mut() {
            if address.user_id == user_id && address.id != keep {
                address.is_default = false;
            }
        }
        Ok(())
    }

    async fn addresses_for_user(&self, user_id: Uuid) -> Result<Vec<Address>, StoreError> {
        let state = self.inner.read().await;
        Ok(state.addresses.iter().filter(|a| a.user_id == user_id).cloned().collect())
    }

    async fn upsert_cart_line(&self, user_id: Uuid, line: &CartLine) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        let lines = state.cart_lines.entry(user_id).or_default();
        if let Some(existing) = lines.iter_mut().find(|l| l.key() == line.key()) {
            existing.quantity += line.quantity;
        } else {
            lines.push(line.clone());
        }
        Ok(())
    }

    async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, StoreError> {
        let state = self.inner.read().await;
        Ok(state.cart_lines.get(&user_id).cloned().unwrap_or_default())
    }

    async fn remove_cart_line(&self, user_id: Uuid, key: &LineKey) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        if let Some(lines) = state.cart_lines.get_mut(&user_id) {
            lines.retain(|l| l.key() != *key);
        }
        Ok(())
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        state.cart_lines.remove(&user_id);
        Ok(())
    }

    async fn commit_checkout(&self, write: CheckoutWrite) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;

        // Validate before the first mutation so a failure leaves no writes.
        if let UserWrite::Reuse(id) = &write.user {
            if !state.users.contains_key(id) {
                return Err(StoreError::NotFound { entity: "user", id: *id });
            }
        }

        if let UserWrite::Create(user) = write.user {
            state.users.insert(user.id, user);
        }
        state.addresses.push(write.address);
        state.order_items.insert(write.order.id, write.items);
        for vendor_order in write.vendor_orders {
            state.vendor_orders.insert(vendor_order.id, vendor_order);
        }
        state.tracking_events.push(write.initial_event);
        state.orders.insert(write.order.id, write.order);
        if let Some(user_id) = write.clear_cart_for {
            state.cart_lines.remove(&user_id);
        }
        Ok(())
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let state = self.inner.read().await;
        let mut orders: Vec<Order> = state.orders.values().filter(|o| o.user_id == user_id).cloned().collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        let state = self.inner.read().await;
        Ok(state.order_items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn vendor_order(&self, id: Uuid) -> Result<Option<VendorOrder>, StoreError> {
        Ok(self.inner.read().await.vendor_orders.get(&id).cloned())
    }

    async fn vendor_orders_for_order(&self, order_id: Uuid) -> Result<Vec<VendorOrder>, StoreError> {
        let state = self.inner.read().await;
        let mut vendor_orders: Vec<VendorOrder> = state
            .vendor_orders
            .values()
            .filter(|vo| vo.order_id == order_id)
            .cloned()
            .collect();
        vendor_orders.sort_by_key(|vo| vo.created_at);
        Ok(vendor_orders)
    }

    async fn save_order_status(&self, order: &Order, event: TrackingEvent) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        let stored = state
            .orders
            .get_mut(&order.id)
            .ok_or(StoreError::NotFound { entity: "order", id: order.id })?;
        *stored = order.clone();
        state.tracking_events.push(event);
        Ok(())
    }

    async fn save_vendor_order_status(&self, vendor_order: &VendorOrder, event: TrackingEvent) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        let stored = state
            .vendor_orders
            .get_mut(&vendor_order.id)
            .ok_or(StoreError::NotFound { entity: "vendor order", id: vendor_order.id })?;
        *stored = vendor_order.clone();
        state.tracking_events.push(event);
        Ok(())
    }

    async fn timeline(&self, order_id: Uuid) -> Result<Vec<TrackingEvent>, StoreError> {
        let state = self.inner.read().await;
        let mut events: Vec<TrackingEvent> = state
            .tracking_events
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect();
        TrackingEvent::sort_timeline(&mut events);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Money;

    #[tokio::test]
    async fn test_upsert_cart_line_merges_on_key() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let line = CartLine::new(Uuid::new_v4(), "Widget", "Acme", Money::usd(Decimal::new(10, 0)));
        store.upsert_cart_line(user_id, &line).await.unwrap();
        store.upsert_cart_line(user_id, &line).await.unwrap();
        let lines = store.cart_lines(user_id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_clear_cart_is_idempotent() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        store.clear_cart(user_id).await.unwrap();
        store.clear_cart(user_id).await.unwrap();
        assert!(store.cart_lines(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_checkout_rejects_unknown_reused_user_without_writes() {
        let store = MemoryStore::new();
        let ghost = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        let now = chrono::Utc::now();
        let order = Order {
            id: order_id,
            order_number: "ORD-1".into(),
            user_id: ghost,
            email: "a@b.com".into(),
            status: Default::default(),
            payment_status: Default::default(),
            payment_method: "CASH_ON_DELIVERY".into(),
            currency: "USD".into(),
            subtotal: Decimal::ZERO,
            shipping: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            ship_name: "A".into(),
            ship_phone: None,
            ship_street: "s".into(),
            ship_city: "c".into(),
            ship_state: None,
            ship_postal_code: "p".into(),
            ship_country: "US".into(),
            created_at: now,
            updated_at: now,
        };
        let address = Address {
            id: Uuid::new_v4(),
            user_id: ghost,
            full_name: "A".into(),
            phone: None,
            street: "s".into(),
            city: "c".into(),
            state: None,
            postal_code: "p".into(),
            country: "US".into(),
            is_default: true,
            created_at: now,
        };
        let write = CheckoutWrite {
            user: UserWrite::Reuse(ghost),
            address,
            initial_event: TrackingEvent::for_order(order_id, Default::default()),
            order,
            items: vec![],
            vendor_orders: vec![],
            clear_cart_for: None,
        };
        assert!(store.commit_checkout(write).await.is_err());
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.address_count().await, 0);
    }
}
