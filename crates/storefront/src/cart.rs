//! Cart store: in-memory cart kept in step with the backend.
//!
//! # Consistency
//!
//! - State changes only after the backend confirms a mutation
//! - Mutations run one at a time, in call order, so a slow response can
//!   never overwrite a newer one
//! - Every committed change is written through to the [`LocalMirror`]
//! - A failure records the error, publishes a notice and keeps the cart as is

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};
use vitrine_core::{
    Cart, CartLineItem, CartSnapshot, CartSummary, LineItemId, LineKey, PricingRules, Product,
    QuantityDelta, UserId, VariantId,
};

use crate::api::{AddCartItem, ApiError, CartMutation, RemoteStore};
use crate::error::{Result, StoreError, UnknownPolicy, add_breadcrumb};
use crate::mirror::LocalMirror;
use crate::notice::Notifier;
use crate::session::Session;

/// What `update_quantity` does when the step would leave the quantity
/// unchanged (decrement at 1, increment at the stock limit).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Succeed without calling the backend.
    #[default]
    SkipRemote,
    /// Call the backend anyway and clamp whatever it returns.
    AlwaysCallRemote,
}

impl FromStr for BoundaryPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" | "skip_remote" => Ok(Self::SkipRemote),
            "always" | "always_call_remote" => Ok(Self::AlwaysCallRemote),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// Cart store settings.
#[derive(Debug, Clone, Default)]
pub struct CartOptions {
    pub boundary_policy: BoundaryPolicy,
    pub pricing: PricingRules,
}

/// Observable cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub cart: Cart,
    /// A backend call is in flight.
    pub loading: bool,
    /// Error from the most recent failed operation.
    pub error: Option<StoreError>,
    /// The current items came from the local mirror, not the backend.
    pub restored_from_mirror: bool,
}

/// Cart store.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    remote: Arc<dyn RemoteStore>,
    mirror: Arc<dyn LocalMirror>,
    notifier: Notifier,
    options: CartOptions,
    state: watch::Sender<CartState>,
    /// Serializes mutations; tokio's mutex is fair, so calls run in order.
    writes: Mutex<()>,
}

impl CartStore {
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        mirror: Arc<dyn LocalMirror>,
        notifier: Notifier,
        options: CartOptions,
    ) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                remote,
                mirror,
                notifier,
                options,
                state: watch::Sender::new(CartState::default()),
                writes: Mutex::new(()),
            }),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Current lines.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.inner.state.borrow().cart.items().to_vec()
    }

    /// Order summary for the current lines.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        self.inner.state.borrow().cart.summary(&self.inner.options.pricing)
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load the mirrored cart, if any, into memory.
    ///
    /// Returns `true` when a snapshot was restored. A missing, unreadable or
    /// outdated snapshot leaves the cart empty.
    pub fn restore_from_mirror(&self) -> bool {
        let snapshot = match self.inner.mirror.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cart snapshot");
                return false;
            }
        };

        if snapshot.version != CartSnapshot::VERSION {
            warn!(
                version = snapshot.version,
                "Ignoring cart snapshot with unknown version"
            );
            return false;
        }

        let cart = snapshot.into_cart();
        debug!(lines = cart.len(), "Restored cart from mirror");
        self.inner.state.send_modify(|state| {
            state.cart = cart;
            state.restored_from_mirror = true;
        });
        true
    }

    /// Restore from the mirror, then replace with the backend's cart when
    /// the session is authenticated.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the restored cart stays visible.
    pub async fn start(&self, session: &Session, user_id: &UserId) -> Result<()> {
        self.restore_from_mirror();
        if session.is_authenticated() {
            self.fetch_cart(session, user_id).await
        } else {
            Ok(())
        }
    }

    /// Drop the in-memory cart and the mirrored copy (logout).
    pub fn reset_local(&self) {
        self.inner.state.send_replace(CartState::default());
        if let Err(e) = self.inner.mirror.clear() {
            warn!(error = %e, "Failed to clear cart mirror");
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Replace the cart with the backend's view.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a token (no backend call); otherwise the
    /// classified backend error.
    #[instrument(skip(self, session), fields(user_id = %user_id))]
    pub async fn fetch_cart(&self, session: &Session, user_id: &UserId) -> Result<()> {
        if let Err(err) = session.require_token() {
            return Err(self.fail(err));
        }

        let _guard = self.inner.writes.lock().await;
        self.begin();

        let items = self
            .inner
            .remote
            .fetch_cart(session, user_id)
            .await
            .map_err(|e| self.fail(e.into()))?;

        self.commit(|cart| cart.replace(items));
        Ok(())
    }

    /// Add `quantity` units of a product variant.
    ///
    /// Without an explicit `variant_id` the product's first variant is used.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` for zero
    /// - `Unauthenticated` without a token (no backend call)
    /// - `NotFound` when the variant does not exist
    /// - `OutOfStock` when the line would exceed the variant's stock, locally
    ///   or according to the backend
    #[instrument(skip(self, session, product), fields(product_id = %product.id))]
    pub async fn add_item(
        &self,
        session: &Session,
        product: &Product,
        variant_id: Option<&VariantId>,
        quantity: u32,
    ) -> Result<()> {
        if quantity == 0 {
            return Err(self.fail(StoreError::InvalidQuantity(quantity)));
        }
        if let Err(err) = session.require_token() {
            return Err(self.fail(err));
        }

        let variant = match variant_id {
            Some(id) => product.variant(id),
            None => product.first_variant(),
        };
        let Some(variant) = variant else {
            let missing = variant_id.map_or_else(
                || format!("variant for product {}", product.id),
                |id| format!("variant {id}"),
            );
            return Err(self.fail(StoreError::NotFound(missing)));
        };

        let _guard = self.inner.writes.lock().await;

        let key = LineKey {
            product_id: product.id.clone(),
            variant_id: Some(variant.id.clone()),
        };
        let existing = self
            .inner
            .state
            .borrow()
            .cart
            .find_by_key(&key)
            .map_or(0, |line| line.quantity);
        let max_quantity = variant.max_quantity();
        if existing.saturating_add(quantity) > max_quantity {
            return Err(self.fail(StoreError::OutOfStock(format!(
                "{existing} in cart, {quantity} requested, {max_quantity} available"
            ))));
        }

        add_breadcrumb("cart", "Add to cart", Some(&[("product_id", product.id.as_str())]));
        self.begin();

        let request = AddCartItem {
            product_id: product.id.clone(),
            variant_id: Some(variant.id.clone()),
            quantity,
            unit_price: variant.effective_price(),
            max_quantity,
        };
        let mutation = self
            .inner
            .remote
            .add_cart_item(session, &request)
            .await
            .map_err(|e| self.fail(e.into()))?;

        match mutation {
            CartMutation::Item(line) => self.commit(|cart| {
                let line_id = line.id.clone();
                let total = cart.merge_added(line, quantity);
                debug!(line_id = %line_id, quantity = total, "Merged added line");
            }),
            CartMutation::Cart(items) => self.commit(|cart| cart.replace(items)),
        }

        self.inner.notifier.success("Added to cart");
        Ok(())
    }

    /// Step a line's quantity up or down by one.
    ///
    /// The target is clamped to `[1, max_quantity]`. When the step changes
    /// nothing, [`BoundaryPolicy`] decides whether the backend is called.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a token, `NotFound` for an unknown line;
    /// otherwise the classified backend error.
    #[instrument(skip(self, session), fields(item_id = %item_id))]
    pub async fn update_quantity(
        &self,
        session: &Session,
        item_id: &LineItemId,
        delta: QuantityDelta,
    ) -> Result<()> {
        if let Err(err) = session.require_token() {
            return Err(self.fail(err));
        }

        let _guard = self.inner.writes.lock().await;

        let current = self.inner.state.borrow().cart.find(item_id).cloned();
        let Some(line) = current else {
            return Err(self.fail(StoreError::NotFound(item_id.to_string())));
        };

        let target = delta.apply(line.quantity, line.max_quantity);
        if target == line.quantity
            && self.inner.options.boundary_policy == BoundaryPolicy::SkipRemote
        {
            debug!(quantity = line.quantity, "Quantity already at bound");
            return Ok(());
        }

        self.begin();
        let update = self
            .inner
            .remote
            .update_cart_item(session, item_id, delta)
            .await
            .map_err(|e| self.fail(e.into()))?;

        self.commit(|cart| {
            cart.apply_update(item_id, update.quantity, update.max_quantity);
        });
        Ok(())
    }

    /// Remove a line.
    ///
    /// Removing a line that is not in the cart succeeds without calling the
    /// backend, and a backend `NotFound` counts as removed.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a token; otherwise the classified backend
    /// error.
    #[instrument(skip(self, session), fields(item_id = %item_id))]
    pub async fn remove_item(&self, session: &Session, item_id: &LineItemId) -> Result<()> {
        let _guard = self.inner.writes.lock().await;

        if self.inner.state.borrow().cart.find(item_id).is_none() {
            debug!("Line not in cart, nothing to remove");
            return Ok(());
        }
        if let Err(err) = session.require_token() {
            return Err(self.fail(err));
        }

        add_breadcrumb("cart", "Remove from cart", Some(&[("item_id", item_id.as_str())]));
        self.begin();

        match self.inner.remote.remove_cart_item(session, item_id).await {
            Ok(()) => {}
            Err(ApiError::NotFound(_)) => debug!("Line already gone on the backend"),
            Err(e) => return Err(self.fail(e.into())),
        }

        self.commit(|cart| {
            cart.remove(item_id);
        });
        self.inner.notifier.success("Removed from cart");
        Ok(())
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a token; otherwise the classified backend
    /// error.
    #[instrument(skip(self, session))]
    pub async fn clear(&self, session: &Session) -> Result<()> {
        if let Err(err) = session.require_token() {
            return Err(self.fail(err));
        }

        let _guard = self.inner.writes.lock().await;
        self.begin();

        self.inner
            .remote
            .clear_cart(session)
            .await
            .map_err(|e| self.fail(e.into()))?;

        self.commit(Cart::clear);
        info!("Cart cleared");
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn begin(&self) {
        self.inner.state.send_modify(|state| state.loading = true);
    }

    /// Apply a confirmed change and write it through to the mirror.
    fn commit(&self, change: impl FnOnce(&mut Cart)) {
        self.inner.state.send_modify(|state| {
            change(&mut state.cart);
            state.loading = false;
            state.error = None;
            state.restored_from_mirror = false;
        });

        let snapshot = CartSnapshot::of(&self.inner.state.borrow().cart);
        if let Err(e) = self.inner.mirror.save(&snapshot) {
            warn!(error = %e, "Failed to write cart mirror");
        }
    }

    /// Record a failure and hand the error back to the caller.
    fn fail(&self, err: StoreError) -> StoreError {
        err.report();
        self.inner.notifier.error(err.user_message());
        self.inner.state.send_modify(|state| {
            state.loading = false;
            state.error = Some(err.clone());
        });
        err
    }
}
