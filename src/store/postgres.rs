//! PostgreSQL store implementation.
//!
//! Runtime-checked sqlx queries; enums travel as their wire strings. The
//! checkout write and every status change run inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::aggregates::cart::CartLine;
use crate::domain::aggregates::order::{Order, OrderItem};
use crate::domain::aggregates::product::{Product, Variant};
use crate::domain::aggregates::user::{Address, User};
use crate::domain::aggregates::vendor_order::VendorOrder;
use crate::domain::events::TrackingEvent;
use crate::domain::value_objects::{LineKey, Money, ParseEnumError};

use super::{CheckoutWrite, CommerceStore, StoreError, UserWrite};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse<T>(value: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr<Err = ParseEnumError>,
{
    value.parse().map_err(|e: ParseEnumError| StoreError::Corrupt { detail: e.to_string() })
}

fn quantity_from_db(value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt { detail: format!("negative quantity: {value}") })
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    vendor_id: Uuid,
    vendor_name: String,
    name: String,
    image_url: Option<String>,
    base_price: Decimal,
    sale_price: Option<Decimal>,
    currency: String,
    status: String,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;
    fn try_from(row: ProductRow) -> Result<Self, StoreError> {
        Ok(Product {
            id: row.id,
            vendor_id: row.vendor_id,
            vendor_name: row.vendor_name,
            name: row.name,
            image_url: row.image_url,
            base_price: row.base_price,
            sale_price: row.sale_price,
            currency: row.currency,
            status: parse(&row.status)?,
        })
    }
}

#[derive(FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    label: String,
    price: Option<Decimal>,
    sale_price: Option<Decimal>,
    is_active: bool,
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Variant {
            id: row.id,
            product_id: row.product_id,
            label: row.label,
            price: row.price,
            sale_price: row.sale_price,
            is_active: row.is_active,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    full_name: String,
    phone: Option<String>,
    role: String,
    status: String,
    credential: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;
    fn try_from(row: UserRow) -> Result<Self, StoreError> {
        Ok(User {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            phone: row.phone,
            role: parse(&row.role)?,
            status: parse(&row.status)?,
            credential: row.credential,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AddressRow {
    id: Uuid,
    user_id: Uuid,
    full_name: String,
    phone: Option<String>,
    street: String,
    city: String,
    state: Option<String>,
    postal_code: String,
    country: String,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Address {
            id: row.id,
            user_id: row.user_id,
            full_name: row.full_name,
            phone: row.phone,
            street: row.street,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
            is_default: row.is_default,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct CartLineRow {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    purchase_type: String,
    name: String,
    image_url: Option<String>,
    vendor_name: String,
    unit_amount: Decimal,
    currency: String,
    quantity: i32,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = StoreError;
    fn try_from(row: CartLineRow) -> Result<Self, StoreError> {
        Ok(CartLine {
            product_id: row.product_id,
            variant_id: row.variant_id,
            purchase_type: parse(&row.purchase_type)?,
            name: row.name,
            image_url: row.image_url,
            vendor_name: row.vendor_name,
            unit_price: Money::new(row.unit_amount, &row.currency),
            quantity: quantity_from_db(row.quantity)?,
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    email: String,
    status: String,
    payment_status: String,
    payment_method: String,
    currency: String,
    subtotal: Decimal,
    shipping: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    ship_name: String,
    ship_phone: Option<String>,
    ship_street: String,
    ship_city: String,
    ship_state: Option<String>,
    ship_postal_code: String,
    ship_country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(row: OrderRow) -> Result<Self, StoreError> {
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            email: row.email,
            status: parse(&row.status)?,
            payment_status: parse(&row.payment_status)?,
            payment_method: row.payment_method,
            currency: row.currency,
            subtotal: row.subtotal,
            shipping: row.shipping,
            tax: row.tax,
            discount: row.discount,
            total: row.total,
            ship_name: row.ship_name,
            ship_phone: row.ship_phone,
            ship_street: row.ship_street,
            ship_city: row.ship_city,
            ship_state: row.ship_state,
            ship_postal_code: row.ship_postal_code,
            ship_country: row.ship_country,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    vendor_order_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    purchase_type: String,
    name: String,
    quantity: i32,
    price_per_unit: Decimal,
    total_price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;
    fn try_from(row: OrderItemRow) -> Result<Self, StoreError> {
        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            vendor_order_id: row.vendor_order_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            purchase_type: parse(&row.purchase_type)?,
            name: row.name,
            quantity: quantity_from_db(row.quantity)?,
            price_per_unit: row.price_per_unit,
            total_price: row.total_price,
        })
    }
}

#[derive(FromRow)]
struct VendorOrderRow {
    id: Uuid,
    order_id: Uuid,
    vendor_id: Uuid,
    vendor_name: String,
    currency: String,
    subtotal: Decimal,
    commission: Decimal,
    earnings: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VendorOrderRow> for VendorOrder {
    type Error = StoreError;
    fn try_from(row: VendorOrderRow) -> Result<Self, StoreError> {
        Ok(VendorOrder {
            id: row.id,
            order_id: row.order_id,
            vendor_id: row.vendor_id,
            vendor_name: row.vendor_name,
            currency: row.currency,
            subtotal: row.subtotal,
            commission: row.commission,
            earnings: row.earnings,
            status: parse(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TrackingEventRow {
    id: Uuid,
    order_id: Uuid,
    vendor_order_id: Option<Uuid>,
    status: String,
    description: Option<String>,
    location: Option<String>,
    carrier: Option<String>,
    tracking_number: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<TrackingEventRow> for TrackingEvent {
    type Error = StoreError;
    fn try_from(row: TrackingEventRow) -> Result<Self, StoreError> {
        Ok(TrackingEvent {
            id: row.id,
            order_id: row.order_id,
            vendor_order_id: row.vendor_order_id,
            status: parse(&row.status)?,
            description: row.description,
            location: row.location,
            carrier: row.carrier,
            tracking_number: row.tracking_number,
            occurred_at: row.occurred_at,
        })
    }
}

async fn insert_user(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, user: &User) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO users (id, email, full_name, phone, role, status, credential, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.full_name)
    .bind(&user.phone)
    .bind(user.role.as_str())
    .bind(user.status.as_str())
    .bind(&user.credential)
    .bind(user.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_tracking_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event: &TrackingEvent,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO tracking_events (id, order_id, vendor_order_id, status, description, location, carrier, tracking_number, occurred_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(event.id)
    .bind(event.order_id)
    .bind(event.vendor_order_id)
    .bind(event.status.as_str())
    .bind(&event.description)
    .bind(&event.location)
    .bind(&event.carrier)
    .bind(&event.tracking_number)
    .bind(event.occurred_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl CommerceStore for PgStore {
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, vendor_id, vendor_name, name, image_url, base_price, sale_price, currency, status \
             FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn variants_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Variant>, StoreError> {
        let rows = sqlx::query_as::<_, VariantRow>(
            "SELECT id, product_id, label, price, sale_price, is_active FROM variants WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Variant::from).collect())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, full_name, phone, role, status, credential, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn touch_user_contact(&self, user_id: Uuid, full_name: &str, phone: Option<&str>) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET full_name = $2, phone = COALESCE($3, phone) WHERE id = $1")
            .bind(user_id)
            .bind(full_name)
            .bind(phone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn demote_other_defaults(&self, user_id: Uuid, keep: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND id <> $2 AND is_default")
            .bind(user_id)
            .bind(keep)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn addresses_for_user(&self, user_id: Uuid) -> Result<Vec<Address>, StoreError> {
        let rows = sqlx::query_as::<_, AddressRow>(
            "SELECT id, user_id, full_name, phone, street, city, state, postal_code, country, is_default, created_at \
             FROM addresses WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Address::from).collect())
    }

    async fn upsert_cart_line(&self, user_id: Uuid, line: &CartLine) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO cart_lines (id, user_id, product_id, variant_id, purchase_type, name, image_url, vendor_name, unit_amount, currency, quantity) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (user_id, product_id, (COALESCE(variant_id, '00000000-0000-0000-0000-000000000000'::uuid)), purchase_type) \
             DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(line.product_id)
        .bind(line.variant_id)
        .bind(line.purchase_type.as_str())
        .bind(&line.name)
        .bind(&line.image_url)
        .bind(&line.vendor_name)
        .bind(line.unit_price.amount())
        .bind(line.unit_price.currency())
        .bind(line.quantity as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, StoreError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            "SELECT product_id, variant_id, purchase_type, name, image_url, vendor_name, unit_amount, currency, quantity \
             FROM cart_lines WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CartLine::try_from).collect()
    }

    async fn remove_cart_line(&self, user_id: Uuid, key: &LineKey) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2 \
             AND variant_id IS NOT DISTINCT FROM $3 AND purchase_type = $4",
        )
        .bind(user_id)
        .bind(key.product_id)
        .bind(key.variant_id)
        .bind(key.purchase_type.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn commit_checkout(&self, write: CheckoutWrite) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        match &write.user {
            UserWrite::Reuse(id) => {
                let exists = sqlx::query("SELECT 1 FROM users WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
                if exists.is_none() {
                    return Err(StoreError::NotFound { entity: "user", id: *id });
                }
            }
            UserWrite::Create(user) => insert_user(&mut tx, user).await?,
        }

        let address = &write.address;
        sqlx::query(
            "INSERT INTO addresses (id, user_id, full_name, phone, street, city, state, postal_code, country, is_default, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(address.id)
        .bind(address.user_id)
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(address.is_default)
        .bind(address.created_at)
        .execute(&mut *tx)
        .await?;

        let order = &write.order;
        sqlx::query(
            "INSERT INTO orders (id, order_number, user_id, email, status, payment_status, payment_method, currency, \
             subtotal, shipping, tax, discount, total, \
             ship_name, ship_phone, ship_street, ship_city, ship_state, ship_postal_code, ship_country, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)",
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(&order.email)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.payment_method)
        .bind(&order.currency)
        .bind(order.subtotal)
        .bind(order.shipping)
        .bind(order.tax)
        .bind(order.discount)
        .bind(order.total)
        .bind(&order.ship_name)
        .bind(&order.ship_phone)
        .bind(&order.ship_street)
        .bind(&order.ship_city)
        .bind(&order.ship_state)
        .bind(&order.ship_postal_code)
        .bind(&order.ship_country)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for vendor_order in &write.vendor_orders {
            sqlx::query(
                "INSERT INTO vendor_orders (id, order_id, vendor_id, vendor_name, currency, subtotal, commission, earnings, status, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(vendor_order.id)
            .bind(vendor_order.order_id)
            .bind(vendor_order.vendor_id)
            .bind(&vendor_order.vendor_name)
            .bind(&vendor_order.currency)
            .bind(vendor_order.subtotal)
            .bind(vendor_order.commission)
            .bind(vendor_order.earnings)
            .bind(vendor_order.status.as_str())
            .bind(vendor_order.created_at)
            .bind(vendor_order.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for item in &write.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, vendor_order_id, product_id, variant_id, purchase_type, name, quantity, price_per_unit, total_price) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.vendor_order_id)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(item.purchase_type.as_str())
            .bind(&item.name)
            .bind(item.quantity as i32)
            .bind(item.price_per_unit)
            .bind(item.total_price)
            .execute(&mut *tx)
            .await?;
        }

        insert_tracking_event(&mut tx, &write.initial_event).await?;

        if let Some(user_id) = write.clear_cart_for {
            sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        let rows = sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(OrderItem::try_from).collect()
    }

    async fn vendor_order(&self, id: Uuid) -> Result<Option<VendorOrder>, StoreError> {
        let row = sqlx::query_as::<_, VendorOrderRow>("SELECT * FROM vendor_orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(VendorOrder::try_from).transpose()
    }

    async fn vendor_orders_for_order(&self, order_id: Uuid) -> Result<Vec<VendorOrder>, StoreError> {
        let rows = sqlx::query_as::<_, VendorOrderRow>(
            "SELECT * FROM vendor_orders WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(VendorOrder::try_from).collect()
    }

    async fn save_order_status(&self, order: &Order, event: TrackingEvent) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE orders SET status = $2, payment_status = $3, updated_at = $4 WHERE id = $1")
            .bind(order.id)
            .bind(order.status.as_str())
            .bind(order.payment_status.as_str())
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "order", id: order.id });
        }
        insert_tracking_event(&mut tx, &event).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_vendor_order_status(&self, vendor_order: &VendorOrder, event: TrackingEvent) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE vendor_orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(vendor_order.id)
            .bind(vendor_order.status.as_str())
            .bind(vendor_order.updated_at)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "vendor order", id: vendor_order.id });
        }
        insert_tracking_event(&mut tx, &event).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn timeline(&self, order_id: Uuid) -> Result<Vec<TrackingEvent>, StoreError> {
        let rows = sqlx::query_as::<_, TrackingEventRow>(
            "SELECT * FROM tracking_events WHERE order_id = $1 ORDER BY occurred_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TrackingEvent::try_from).collect()
    }
}
