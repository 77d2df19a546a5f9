//! Persistence seam.
//!
//! `CommerceStore` is the relational store as the core sees it. The checkout
//! write phase is a single trait method so each backend can make it atomic:
//! the Postgres implementation wraps it in one transaction, the in-memory
//! implementation in one lock scope. All implementations must be
//! thread-safe (Send + Sync).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::cart::CartLine;
use crate::domain::aggregates::order::{Order, OrderItem};
use crate::domain::aggregates::product::{Product, Variant};
use crate::domain::aggregates::user::{Address, User};
use crate::domain::aggregates::vendor_order::VendorOrder;
use crate::domain::events::TrackingEvent;
use crate::domain::value_objects::LineKey;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("corrupt row: {detail}")]
    Corrupt { detail: String },
}

/// Which user row the checkout write should attach to.
#[derive(Clone, Debug)]
pub enum UserWrite {
    /// An existing user (authenticated actor, or a guest whose email matched).
    Reuse(Uuid),
    /// A user materialized for this checkout.
    Create(User),
}

impl UserWrite {
    pub fn user_id(&self) -> Uuid {
        match self {
            UserWrite::Reuse(id) => *id,
            UserWrite::Create(user) => user.id,
        }
    }
}

/// Everything the checkout transactor persists, applied all-or-nothing.
/// Nothing in here is visible to readers until the whole write commits.
#[derive(Clone, Debug)]
pub struct CheckoutWrite {
    pub user: UserWrite,
    pub address: Address,
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub vendor_orders: Vec<VendorOrder>,
    pub initial_event: TrackingEvent,
    /// Authenticated actors get their server-side cart cleared in the same
    /// write. Clearing an already-empty cart is a no-op.
    pub clear_cart_for: Option<Uuid>,
}

#[async_trait]
pub trait CommerceStore: Send + Sync {
    // -- catalog reads ------------------------------------------------------

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError>;
    async fn variants_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Variant>, StoreError>;

    // -- identity -----------------------------------------------------------

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Best-effort profile touch-up; callers log and ignore failures.
    async fn touch_user_contact(&self, user_id: Uuid, full_name: &str, phone: Option<&str>) -> Result<(), StoreError>;

    // -- addresses ----------------------------------------------------------

    /// Unsets `is_default` on every address of `user_id` except `keep`.
    async fn demote_other_defaults(&self, user_id: Uuid, keep: Uuid) -> Result<(), StoreError>;

    async fn addresses_for_user(&self, user_id: Uuid) -> Result<Vec<Address>, StoreError>;

    // -- server-side cart mirror -------------------------------------------

    /// Insert-or-merge on the line key, quantities summed on conflict.
    async fn upsert_cart_line(&self, user_id: Uuid, line: &CartLine) -> Result<(), StoreError>;
    async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, StoreError>;
    async fn remove_cart_line(&self, user_id: Uuid, key: &LineKey) -> Result<(), StoreError>;
    async fn clear_cart(&self, user_id: Uuid) -> Result<(), StoreError>;

    // -- checkout -----------------------------------------------------------

    /// Applies the whole checkout write atomically.
    async fn commit_checkout(&self, write: CheckoutWrite) -> Result<(), StoreError>;

    // -- orders -------------------------------------------------------------

    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError>;
    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError>;
    async fn vendor_order(&self, id: Uuid) -> Result<Option<VendorOrder>, StoreError>;
    async fn vendor_orders_for_order(&self, order_id: Uuid) -> Result<Vec<VendorOrder>, StoreError>;

    /// Persists an already-validated status change and appends its tracking
    /// event in the same write.
    async fn save_order_status(&self, order: &Order, event: TrackingEvent) -> Result<(), StoreError>;
    async fn save_vendor_order_status(&self, vendor_order: &VendorOrder, event: TrackingEvent) -> Result<(), StoreError>;

    /// Tracking events for an order, ascending by occurrence time.
    async fn timeline(&self, order_id: Uuid) -> Result<Vec<TrackingEvent>, StoreError>;
}
