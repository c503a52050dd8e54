//! Cart line items and the merge rules that keep a cart consistent.
//!
//! A cart never holds two lines for the same product variant: adding an
//! existing variant grows the existing line instead.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{LineItemId, ProductId, VariantId};
use super::price::{CartSummary, PricingRules};

/// Line quantity cap used when the backend does not report stock.
pub const DEFAULT_MAX_QUANTITY: u32 = 10;

/// One cart entry: a product variant and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Line ID assigned by the backend.
    pub id: LineItemId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Variant being purchased, when the backend reports one.
    pub variant_id: Option<VariantId>,
    /// Unit price captured when the line was first added.
    pub unit_price_at_addition: Decimal,
    /// Units on this line (`1..=max_quantity`).
    pub quantity: u32,
    /// Variant stock at the time of the add.
    pub max_quantity: u32,
}

impl CartLineItem {
    /// The identity used for merging.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            variant_id: self.variant_id.clone(),
        }
    }

    /// `unit_price_at_addition * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price_at_addition * Decimal::from(self.quantity)
    }
}

/// Merge identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
}

/// A single-step quantity change from the +/- controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityDelta {
    Increment,
    Decrement,
}

impl QuantityDelta {
    /// Signed step sent to the backend.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Increment => 1,
            Self::Decrement => -1,
        }
    }

    /// Apply the step to `current`, clamped to `[1, max]`.
    #[must_use]
    pub fn apply(self, current: u32, max: u32) -> u32 {
        let next = match self {
            Self::Increment => current.saturating_add(1),
            Self::Decrement => current.saturating_sub(1),
        };
        next.clamp(1, max.max(1))
    }
}

/// Ordered list of cart lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    /// Build a cart, folding duplicate variants into a single line.
    #[must_use]
    pub fn new(items: Vec<CartLineItem>) -> Self {
        let mut cart = Self::default();
        cart.replace(items);
        cart
    }

    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find a line by its ID.
    #[must_use]
    pub fn find(&self, id: &LineItemId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Find the line holding a product variant.
    #[must_use]
    pub fn find_by_key(&self, key: &LineKey) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.key() == key)
    }

    /// Replace the whole cart with a server view.
    ///
    /// Duplicate variants in the incoming list are folded into the first line
    /// carrying them. The folded line's limit is raised to cover its quantity.
    pub fn replace(&mut self, items: Vec<CartLineItem>) {
        self.items.clear();
        for item in items {
            match self.items.iter_mut().find(|line| line.key() == item.key()) {
                Some(line) => {
                    line.quantity = line.quantity.saturating_add(item.quantity);
                    line.max_quantity = line
                        .max_quantity
                        .max(item.max_quantity)
                        .max(line.quantity);
                }
                None => self.items.push(item),
            }
        }
    }

    /// Reconcile the line returned by an add request for `requested` units.
    ///
    /// When the variant already has a line, a returned quantity equal to
    /// `requested` is the increment and is summed onto the line; any other
    /// quantity is the backend's total for the line. The line keeps its
    /// original unit price and position. A new variant is appended.
    ///
    /// Returns the line's resulting quantity.
    pub fn merge_added(&mut self, added: CartLineItem, requested: u32) -> u32 {
        let key = added.key();
        if let Some(line) = self.items.iter_mut().find(|line| line.key() == key) {
            line.quantity = if added.quantity == requested {
                line.quantity.saturating_add(added.quantity)
            } else {
                added.quantity
            };
            line.max_quantity = added.max_quantity.max(line.quantity);
            return line.quantity;
        }

        let quantity = added.quantity;
        self.items.push(added);
        quantity
    }

    /// Apply a quantity update returned by the backend.
    ///
    /// The unit price is left untouched. The quantity is clamped to
    /// `[1, max_quantity]`, taking the backend's stock figure when it reports
    /// one. Returns `false` when the line is no longer in the cart.
    pub fn apply_update(
        &mut self,
        id: &LineItemId,
        quantity: u32,
        max_quantity: Option<u32>,
    ) -> bool {
        let Some(line) = self.items.iter_mut().find(|line| &line.id == id) else {
            return false;
        };
        if let Some(max) = max_quantity {
            line.max_quantity = max.max(1);
        }
        line.quantity = quantity.clamp(1, line.max_quantity.max(1));
        true
    }

    /// Remove a line by ID, returning it if present.
    pub fn remove(&mut self, id: &LineItemId) -> Option<CartLineItem> {
        let index = self.items.iter().position(|item| &item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |total, item| total.saturating_add(item.quantity))
    }

    /// Order summary under the given pricing rules.
    #[must_use]
    pub fn summary(&self, rules: &PricingRules) -> CartSummary {
        CartSummary::from_subtotal(self.subtotal(), self.is_empty(), rules)
    }
}

/// Serialized copy of a cart kept in local storage between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// Snapshot format version.
    pub version: u32,
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
    /// Lines at the time of writing.
    pub items: Vec<CartLineItem>,
}

impl CartSnapshot {
    /// Current snapshot format version.
    pub const VERSION: u32 = 1;

    /// Snapshot the given cart now.
    #[must_use]
    pub fn of(cart: &Cart) -> Self {
        Self {
            version: Self::VERSION,
            saved_at: Utc::now(),
            items: cart.items().to_vec(),
        }
    }

    /// Rebuild the cart held by this snapshot.
    #[must_use]
    pub fn into_cart(self) -> Cart {
        Cart::new(self.items)
    }
}
