//! Wishlist entries normalized from the backend's mixed response shapes.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::{Product, ProductRef};

/// A wishlisted product, with its record when one has been loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

impl WishlistEntry {
    /// An entry known only by ID.
    #[must_use]
    pub const fn bare(product_id: ProductId) -> Self {
        Self {
            product_id,
            product: None,
        }
    }

    /// An entry with its full record.
    #[must_use]
    pub fn hydrated(product: Product) -> Self {
        Self {
            product_id: product.id.clone(),
            product: Some(product),
        }
    }

    /// Whether the product record still needs to be fetched.
    #[must_use]
    pub const fn needs_hydration(&self) -> bool {
        self.product.is_none()
    }
}

impl From<ProductRef> for WishlistEntry {
    fn from(reference: ProductRef) -> Self {
        match reference {
            ProductRef::Id(id) => Self::bare(id),
            ProductRef::Record(product) => Self::hydrated(*product),
        }
    }
}

/// Set of wishlisted products, unique by product ID, in insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist {
    entries: Vec<WishlistEntry>,
}

impl Wishlist {
    /// Build a wishlist, keeping the first (most detailed) entry per product.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = WishlistEntry>) -> Self {
        let mut wishlist = Self::default();
        for entry in entries {
            match wishlist
                .entries
                .iter_mut()
                .find(|e| e.product_id == entry.product_id)
            {
                Some(existing) if existing.needs_hydration() => *existing = entry,
                Some(_) => {}
                None => wishlist.entries.push(entry),
            }
        }
        wishlist
    }

    #[must_use]
    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.entries.iter().any(|e| &e.product_id == product_id)
    }

    /// Append an entry unless the product is already present.
    ///
    /// Returns `true` when the entry was appended.
    pub fn insert(&mut self, entry: WishlistEntry) -> bool {
        if self.contains(&entry.product_id) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Remove every entry for `product_id`, returning how many were removed.
    pub fn remove_all(&mut self, product_id: &ProductId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| &e.product_id != product_id);
        before - self.entries.len()
    }

    /// Attach a fetched record to the entry for its product.
    ///
    /// Returns `false` when no entry matches.
    pub fn attach(&mut self, product: Product) -> bool {
        match self.entries.iter_mut().find(|e| e.product_id == product.id) {
            Some(entry) => {
                entry.product = Some(product);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// IDs of entries still waiting for their product record.
    pub fn unhydrated(&self) -> impl Iterator<Item = &ProductId> {
        self.entries
            .iter()
            .filter(|e| e.needs_hydration())
            .map(|e| &e.product_id)
    }
}
