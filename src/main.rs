//! Vendora - Multi-Vendor Storefront Service

use anyhow::Result;
use axum::{extract::{Path, State}, http::{HeaderMap, StatusCode}, routing::{get, post, put}, Json, Router};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use vendora::{
    Actor, CartLine, CheckoutRequest, CheckoutService, CommerceSettings, CommerceStore,
    FulfillmentService, LineKey, PgStore, StatusUpdate, UserRole,
};

#[derive(Clone)]
struct AppState {
    store: Arc<PgStore>,
    checkout: Arc<CheckoutService<PgStore>>,
    fulfillment: Arc<FulfillmentService<PgStore>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Arc::new(PgStore::connect(&std::env::var("DATABASE_URL")?).await?);
    sqlx::migrate!("./migrations").run(store.pool()).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => async_nats::connect(&url).await.ok(),
        Err(_) => None,
    };
    let settings = CommerceSettings {
        commission_rate: std::env::var("COMMISSION_RATE")
            .ok()
            .and_then(|v| v.parse::<Decimal>().ok())
            .unwrap_or(Decimal::new(10, 2)),
        currency: std::env::var("CURRENCY").unwrap_or_else(|_| "USD".to_string()),
    };

    let state = AppState {
        checkout: Arc::new(CheckoutService::new(store.clone(), settings).with_publisher(nats.clone())),
        fulfillment: Arc::new(FulfillmentService::new(store.clone()).with_publisher(nats)),
        store,
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "vendora"})) }))
        .route("/api/v1/cart/:user_id", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/v1/cart/:user_id/remove", post(remove_cart_line))
        .route("/api/v1/checkout", post(checkout))
        .route("/api/v1/users/:user_id/orders", get(list_user_orders))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/timeline", get(get_timeline))
        .route("/api/v1/orders/:id/status", put(update_order_status))
        .route("/api/v1/orders/:id/pay", post(mark_order_paid))
        .route("/api/v1/vendor-orders/:id/status", put(update_vendor_order_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8084".to_string());
    tracing::info!("🚀 Vendora storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

/// Identity is resolved once here and passed into the core as a typed actor.
/// The upstream gateway authenticates and sets these headers.
fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uuid>().ok());
    let email = headers.get("x-user-email").and_then(|v| v.to_str().ok()).map(str::to_string);
    match (id, email) {
        (Some(id), Some(email)) => Actor::Authenticated { id, email, role: UserRole::User },
        _ => Actor::Guest,
    }
}

async fn get_cart(State(s): State<AppState>, Path(user_id): Path<Uuid>) -> Result<Json<Vec<CartLine>>, (StatusCode, String)> {
    let lines = s.store.cart_lines(user_id).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(lines))
}

async fn add_to_cart(State(s): State<AppState>, Path(user_id): Path<Uuid>, Json(line): Json<CartLine>) -> Result<(StatusCode, Json<Vec<CartLine>>), (StatusCode, String)> {
    s.store.upsert_cart_line(user_id, &line).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let lines = s.store.cart_lines(user_id).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((StatusCode::CREATED, Json(lines)))
}

async fn remove_cart_line(State(s): State<AppState>, Path(user_id): Path<Uuid>, Json(key): Json<LineKey>) -> Result<StatusCode, (StatusCode, String)> {
    s.store.remove_cart_line(user_id, &key).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_cart(State(s): State<AppState>, Path(user_id): Path<Uuid>) -> Result<StatusCode, (StatusCode, String)> {
    s.store.clear_cart(user_id).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn checkout(State(s): State<AppState>, headers: HeaderMap, Json(req): Json<CheckoutRequest>) -> (StatusCode, Json<Value>) {
    let actor = actor_from_headers(&headers);
    match s.checkout.place_order(&actor, &req).await {
        Ok(placed) => (
            StatusCode::CREATED,
            Json(json!({
                "ok": true,
                "orderId": placed.order_id,
                "orderNumber": placed.order_number,
                "total": placed.total,
                "currency": placed.currency,
            })),
        ),
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "checkout failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"ok": false, "message": "internal error"})))
        }
        Err(e) => (StatusCode::OK, Json(json!({"ok": false, "message": e.to_string()}))),
    }
}

async fn list_user_orders(State(s): State<AppState>, Path(user_id): Path<Uuid>) -> Result<Json<Value>, (StatusCode, String)> {
    let orders = s.store.orders_for_user(user_id).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(json!({ "orders": orders })))
}

async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, (StatusCode, String)> {
    let order = s
        .store
        .order(id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;
    let items = s.store.order_items(id).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let vendor_orders = s
        .store
        .vendor_orders_for_order(id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(json!({ "order": order, "items": items, "vendorOrders": vendor_orders })))
}

async fn get_timeline(State(s): State<AppState>, Path(id): Path<Uuid>) -> (StatusCode, Json<Value>) {
    match s.fulfillment.timeline(id).await {
        Ok(events) => (StatusCode::OK, Json(json!({ "ok": true, "events": events }))),
        Err(e) if e.is_fatal() => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"ok": false, "reason": "internal error"}))),
        Err(e) => (StatusCode::NOT_FOUND, Json(json!({"ok": false, "reason": e.to_string()}))),
    }
}

async fn update_order_status(State(s): State<AppState>, Path(id): Path<Uuid>, Json(update): Json<StatusUpdate>) -> (StatusCode, Json<Value>) {
    match s.fulfillment.advance_order(id, update).await {
        Ok(order) => (StatusCode::OK, Json(json!({"ok": true, "status": order.status}))),
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, order_id = %id, "status update failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"ok": false, "reason": "internal error"})))
        }
        Err(e) => (StatusCode::OK, Json(json!({"ok": false, "reason": e.to_string()}))),
    }
}

async fn mark_order_paid(State(s): State<AppState>, Path(id): Path<Uuid>) -> (StatusCode, Json<Value>) {
    match s.fulfillment.mark_order_paid(id).await {
        Ok(order) => (StatusCode::OK, Json(json!({"ok": true, "paymentStatus": order.payment_status}))),
        Err(e) if e.is_fatal() => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"ok": false, "reason": "internal error"}))),
        Err(e) => (StatusCode::OK, Json(json!({"ok": false, "reason": e.to_string()}))),
    }
}

async fn update_vendor_order_status(State(s): State<AppState>, Path(id): Path<Uuid>, Json(update): Json<StatusUpdate>) -> (StatusCode, Json<Value>) {
    match s.fulfillment.advance_vendor_order(id, update).await {
        Ok(vendor_order) => (StatusCode::OK, Json(json!({"ok": true, "status": vendor_order.status}))),
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, vendor_order_id = %id, "vendor status update failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"ok": false, "reason": "internal error"})))
        }
        Err(e) => (StatusCode::OK, Json(json!({"ok": false, "reason": e.to_string()}))),
    }
}
