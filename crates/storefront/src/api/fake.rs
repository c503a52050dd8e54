//! In-memory [`RemoteStore`] for store unit tests.

#![allow(clippy::indexing_slicing)]

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use vitrine_core::{
    CartLineItem, LineItemId, Product, ProductId, ProductRef, QuantityDelta, UserId,
};

use super::{AddCartItem, ApiError, CartLineUpdate, CartMutation, RemoteStore, WishlistToggle};
use crate::session::Session;

/// How the fake answers an add.
#[derive(Debug, Clone, Copy, Default)]
pub enum AddShape {
    /// The line with only the added quantity.
    #[default]
    Increment,
    /// The line with its new total.
    Total,
    /// The whole cart.
    WholeCart,
}

#[derive(Default)]
struct FakeState {
    cart: Vec<CartLineItem>,
    wishlist: Vec<ProductId>,
    products: HashMap<ProductId, Product>,
    calls: Vec<&'static str>,
    fail_next: Option<ApiError>,
    next_line: u32,
}

/// Backend double that records every call.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
    delay: Option<Duration>,
    call_delays: HashMap<&'static str, Duration>,
    add_shape: AddShape,
    populated_toggle: bool,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep this long inside calls to `name`, overriding `with_delay`.
    pub fn with_call_delay(mut self, name: &'static str, delay: Duration) -> Self {
        self.call_delays.insert(name, delay);
        self
    }

    /// Answer toggles with full records for known products.
    pub fn with_populated_toggle(mut self) -> Self {
        self.populated_toggle = true;
        self
    }

    pub fn with_add_shape(mut self, shape: AddShape) -> Self {
        self.add_shape = shape;
        self
    }

    pub fn with_product(self, product: Product) -> Self {
        self.lock().products.insert(product.id.clone(), product);
        self
    }

    pub fn with_cart(self, items: Vec<CartLineItem>) -> Self {
        self.lock().cart = items;
        self
    }

    pub fn with_wishlist(self, ids: &[&str]) -> Self {
        self.lock().wishlist = ids.iter().copied().map(ProductId::new).collect();
        self
    }

    /// Fail the next call with `err`.
    pub fn fail_next(&self, err: ApiError) {
        self.lock().fail_next = Some(err);
    }

    /// Number of calls made to `name`.
    pub fn calls(&self, name: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == name).count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn server_cart(&self) -> Vec<CartLineItem> {
        self.lock().cart.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, wait out the delay, and apply any pending failure.
    async fn enter(&self, name: &'static str) -> Result<(), ApiError> {
        self.lock().calls.push(name);
        if let Some(delay) = self.call_delays.get(name).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        self.lock().fail_next.take().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn fetch_cart(
        &self,
        _session: &Session,
        _user_id: &UserId,
    ) -> Result<Vec<CartLineItem>, ApiError> {
        self.enter("fetch_cart").await?;
        Ok(self.lock().cart.clone())
    }

    async fn add_cart_item(
        &self,
        _session: &Session,
        item: &AddCartItem,
    ) -> Result<CartMutation, ApiError> {
        self.enter("add_cart_item").await?;
        let mut state = self.lock();

        let position = state
            .cart
            .iter()
            .position(|l| l.product_id == item.product_id && l.variant_id == item.variant_id);
        let index = if let Some(index) = position {
            state.cart[index].quantity += item.quantity;
            index
        } else {
            state.next_line += 1;
            let id = LineItemId::new(format!("line-{}", state.next_line));
            state.cart.push(CartLineItem {
                id,
                product_id: item.product_id.clone(),
                variant_id: item.variant_id.clone(),
                unit_price_at_addition: item.unit_price,
                quantity: item.quantity,
                max_quantity: item.max_quantity,
            });
            state.cart.len() - 1
        };

        let line = state.cart[index].clone();
        Ok(match self.add_shape {
            AddShape::Increment => CartMutation::Item(CartLineItem {
                quantity: item.quantity,
                ..line
            }),
            AddShape::Total => CartMutation::Item(line),
            AddShape::WholeCart => CartMutation::Cart(state.cart.clone()),
        })
    }

    async fn update_cart_item(
        &self,
        _session: &Session,
        item_id: &LineItemId,
        delta: QuantityDelta,
    ) -> Result<CartLineUpdate, ApiError> {
        self.enter("update_cart_item").await?;
        let mut state = self.lock();
        let line = state
            .cart
            .iter_mut()
            .find(|l| &l.id == item_id)
            .ok_or_else(|| ApiError::NotFound(item_id.to_string()))?;
        line.quantity = delta.apply(line.quantity, line.max_quantity);
        Ok(CartLineUpdate {
            quantity: line.quantity,
            max_quantity: Some(line.max_quantity),
        })
    }

    async fn remove_cart_item(
        &self,
        _session: &Session,
        item_id: &LineItemId,
    ) -> Result<(), ApiError> {
        self.enter("remove_cart_item").await?;
        let mut state = self.lock();
        let before = state.cart.len();
        state.cart.retain(|l| &l.id != item_id);
        if state.cart.len() == before {
            return Err(ApiError::NotFound(item_id.to_string()));
        }
        Ok(())
    }

    async fn clear_cart(&self, _session: &Session) -> Result<(), ApiError> {
        self.enter("clear_cart").await?;
        self.lock().cart.clear();
        Ok(())
    }

    async fn fetch_wishlist(&self, _session: &Session) -> Result<Vec<ProductRef>, ApiError> {
        self.enter("fetch_wishlist").await?;
        Ok(self
            .lock()
            .wishlist
            .iter()
            .cloned()
            .map(ProductRef::Id)
            .collect())
    }

    async fn toggle_wishlist(
        &self,
        _session: &Session,
        product_id: &ProductId,
    ) -> Result<WishlistToggle, ApiError> {
        self.enter("toggle_wishlist").await?;
        let mut state = self.lock();
        let in_wishlist = if state.wishlist.contains(product_id) {
            state.wishlist.retain(|id| id != product_id);
            false
        } else {
            state.wishlist.push(product_id.clone());
            true
        };
        let wishlist = state
            .wishlist
            .iter()
            .map(|id| match state.products.get(id) {
                Some(product) if self.populated_toggle => {
                    ProductRef::Record(Box::new(product.clone()))
                }
                _ => ProductRef::Id(id.clone()),
            })
            .collect();
        Ok(WishlistToggle {
            in_wishlist,
            wishlist,
        })
    }

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        self.enter("fetch_product").await?;
        self.lock()
            .products
            .get(product_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(product_id.to_string()))
    }
}
