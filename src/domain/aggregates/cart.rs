//! Cart ledger.
//!
//! Client-held collection of lines, keyed by `(product, variant,
//! purchase type)`. The line list is what persists across sessions; the
//! `open` flag is transient UI state and is skipped on serialization.
//! Prices held here are display snapshots; checkout re-resolves them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{LineKey, Money, PurchaseType};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    currency: String,
    #[serde(skip)]
    open: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[serde(default)]
    pub purchase_type: PurchaseType,
    pub name: String,
    pub image_url: Option<String>,
    pub vendor_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: Uuid, name: impl Into<String>, vendor_name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            product_id,
            variant_id: None,
            purchase_type: PurchaseType::New,
            name: name.into(),
            image_url: None,
            vendor_name: vendor_name.into(),
            unit_price,
            quantity: 1,
        }
    }

    pub fn with_variant(mut self, variant_id: Uuid) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    pub fn with_purchase_type(mut self, purchase_type: PurchaseType) -> Self {
        self.purchase_type = purchase_type;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.variant_id, self.purchase_type)
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

impl Cart {
    pub fn new(currency: &str) -> Self {
        Self { lines: vec![], currency: currency.to_string(), open: false }
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn is_open(&self) -> bool { self.open }
    pub fn set_open(&mut self, open: bool) { self.open = open; }

    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.key() == *key)
    }

    /// Merge-on-add: a candidate whose key matches an existing line is
    /// absorbed into it (quantities summed, existing display metadata kept).
    /// A zero-quantity candidate counts as one unit. Adding opens the cart.
    pub fn add_line(&mut self, candidate: CartLine) {
        let added = candidate.quantity.max(1);
        if let Some(existing) = self.lines.iter_mut().find(|l| l.key() == candidate.key()) {
            existing.quantity += added;
        } else {
            let mut line = candidate;
            line.quantity = added;
            self.lines.push(line);
        }
        self.open = true;
    }

    pub fn increment(&mut self, key: &LineKey) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.key() == *key) {
            line.quantity += 1;
        }
    }

    /// Decrementing a line at quantity 1 removes it; a line never exists at 0.
    pub fn decrement(&mut self, key: &LineKey) {
        if let Some(pos) = self.lines.iter().position(|l| l.key() == *key) {
            if self.lines[pos].quantity <= 1 {
                self.lines.remove(pos);
            } else {
                self.lines[pos].quantity -= 1;
            }
        }
    }

    /// Sets an explicit quantity. Anything below 1 removes the line.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: i64) {
        if quantity < 1 {
            self.remove_line(key);
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.key() == *key) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    pub fn remove_line(&mut self, key: &LineKey) {
        self.lines.retain(|l| l.key() != *key);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::zero(&self.currency), |acc, l| acc.add(&l.line_total()).unwrap_or(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn widget(product_id: Uuid) -> CartLine {
        CartLine::new(product_id, "Widget", "Acme", Money::usd(Decimal::new(10, 0)))
    }

    #[test]
    fn test_add_merges_on_identical_key() {
        let mut cart = Cart::new("USD");
        let product = Uuid::new_v4();
        cart.add_line(widget(product).with_quantity(2));
        cart.add_line(widget(product));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.subtotal().amount(), Decimal::new(30, 0));
    }

    #[test]
    fn test_distinct_variant_or_purchase_type_is_a_distinct_line() {
        let mut cart = Cart::new("USD");
        let product = Uuid::new_v4();
        let variant = Uuid::new_v4();
        cart.add_line(widget(product));
        cart.add_line(widget(product).with_variant(variant));
        cart.add_line(widget(product).with_purchase_type(PurchaseType::Refurbished));
        assert_eq!(cart.lines().len(), 3);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_merge_keeps_existing_metadata() {
        let mut cart = Cart::new("USD");
        let product = Uuid::new_v4();
        cart.add_line(widget(product).with_image("a.jpg"));
        let mut rival = widget(product);
        rival.name = "Widget (renamed)".into();
        cart.add_line(rival);
        assert_eq!(cart.lines()[0].name, "Widget");
        assert_eq!(cart.lines()[0].image_url.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn test_zero_quantity_candidate_counts_as_one() {
        let mut cart = Cart::new("USD");
        let product = Uuid::new_v4();
        cart.add_line(widget(product).with_quantity(0));
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_decrement_at_one_removes_line() {
        let mut cart = Cart::new("USD");
        let product = Uuid::new_v4();
        cart.add_line(widget(product));
        let key = cart.lines()[0].key();
        cart.decrement(&key);
        assert!(cart.is_empty());
        assert!(cart.line(&key).is_none());
    }

    #[test]
    fn test_increment_and_decrement() {
        let mut cart = Cart::new("USD");
        let product = Uuid::new_v4();
        cart.add_line(widget(product));
        let key = cart.lines()[0].key();
        cart.increment(&key);
        cart.increment(&key);
        assert_eq!(cart.lines()[0].quantity, 3);
        cart.decrement(&key);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_set_quantity_at_or_below_zero_removes() {
        let mut cart = Cart::new("USD");
        let product = Uuid::new_v4();
        cart.add_line(widget(product).with_quantity(5));
        let key = cart.lines()[0].key();
        cart.set_quantity(&key, 2);
        assert_eq!(cart.lines()[0].quantity, 2);
        cart.set_quantity(&key, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_adding_opens_cart_but_open_flag_does_not_persist() {
        let mut cart = Cart::new("USD");
        cart.add_line(widget(Uuid::new_v4()));
        assert!(cart.is_open());
        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.lines().len(), 1);
        assert!(!restored.is_open());
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new("USD");
        cart.add_line(widget(Uuid::new_v4()));
        cart.add_line(widget(Uuid::new_v4()));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal().amount(), Decimal::ZERO);
    }
}
