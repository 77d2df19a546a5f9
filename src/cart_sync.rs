//! Local-first cart mutation with a best-effort server mirror.
//!
//! The client-held ledger is always mutated first and always wins; only
//! authenticated actors also mirror the change into server-side storage,
//! and a mirror failure never rolls back or blocks the local mutation.

use std::sync::Arc;

use crate::domain::aggregates::cart::{Cart, CartLine};
use crate::domain::aggregates::user::Actor;
use crate::domain::value_objects::LineKey;
use crate::store::CommerceStore;

pub struct CartSync<S> {
    store: Arc<S>,
}

impl<S: CommerceStore> CartSync<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn add_line(&self, actor: &Actor, cart: &mut Cart, candidate: CartLine) {
        let mut candidate = candidate;
        candidate.quantity = candidate.quantity.max(1);
        cart.add_line(candidate.clone());
        if let Actor::Authenticated { id, .. } = actor {
            if let Err(e) = self.store.upsert_cart_line(*id, &candidate).await {
                tracing::warn!(error = %e, user_id = %id, "cart mirror add failed; local ledger kept");
            }
        }
    }

    pub async fn remove_line(&self, actor: &Actor, cart: &mut Cart, key: &LineKey) {
        cart.remove_line(key);
        if let Actor::Authenticated { id, .. } = actor {
            if let Err(e) = self.store.remove_cart_line(*id, key).await {
                tracing::warn!(error = %e, user_id = %id, "cart mirror remove failed; local ledger kept");
            }
        }
    }

    pub async fn clear(&self, actor: &Actor, cart: &mut Cart) {
        cart.clear();
        if let Actor::Authenticated { id, .. } = actor {
            if let Err(e) = self.store.clear_cart(*id).await {
                tracing::warn!(error = %e, user_id = %id, "cart mirror clear failed; local ledger kept");
            }
        }
    }
}
