//! Client for the storefront's REST backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth; the stores only mirror it
//! - [`RemoteStore`] is the seam between the stores and the wire, so the
//!   stores can be driven by an in-memory backend in tests
//! - [`HttpRemoteStore`] is the production implementation over `reqwest`
//! - Product records are cached in-process via `moka` (5 minute TTL)
//!
//! # Example
//!
//! ```rust,ignore
//! use vitrine_storefront::api::HttpRemoteStore;
//!
//! let remote = HttpRemoteStore::new(&config.api)?;
//! let items = remote.fetch_cart(&session, &user_id).await?;
//! ```

mod conversions;
mod http;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use http::HttpRemoteStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use vitrine_core::{
    CartLineItem, LineItemId, Product, ProductId, ProductRef, QuantityDelta, UserId, VariantId,
};

use crate::session::Session;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with an unexpected status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but is missing data the stores need.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, expired, or rejected bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Backend refused the quantity for lack of stock.
    #[error("Out of stock: {0}")]
    OutOfStock(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// Input for adding a variant to the cart.
///
/// Only the product, variant and quantity go on the wire. The price and
/// stock limit are what the client saw when the user clicked "add"; they
/// fill in whatever the backend leaves out of its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddCartItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub max_quantity: u32,
}

/// What the backend returned for an add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// The affected line only.
    Item(CartLineItem),
    /// The whole cart after the add.
    Cart(Vec<CartLineItem>),
}

/// A line's quantity after an update, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLineUpdate {
    pub quantity: u32,
    /// Stock limit, when the backend reports one.
    pub max_quantity: Option<u32>,
}

/// Result of a wishlist toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct WishlistToggle {
    /// Membership of the toggled product after the call.
    pub in_wishlist: bool,
    /// The wishlist as the backend now sees it.
    pub wishlist: Vec<ProductRef>,
}

/// Remote source of truth for carts, wishlists and product records.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `GET /cart?userId=`
    async fn fetch_cart(
        &self,
        session: &Session,
        user_id: &UserId,
    ) -> Result<Vec<CartLineItem>, ApiError>;

    /// `POST /cart/items`
    async fn add_cart_item(
        &self,
        session: &Session,
        item: &AddCartItem,
    ) -> Result<CartMutation, ApiError>;

    /// `PATCH /cart/items/:id`
    async fn update_cart_item(
        &self,
        session: &Session,
        item_id: &LineItemId,
        delta: QuantityDelta,
    ) -> Result<CartLineUpdate, ApiError>;

    /// `DELETE /cart/items/:id`
    async fn remove_cart_item(&self, session: &Session, item_id: &LineItemId)
    -> Result<(), ApiError>;

    /// `DELETE /cart`
    async fn clear_cart(&self, session: &Session) -> Result<(), ApiError>;

    /// `GET /wishlist`
    async fn fetch_wishlist(&self, session: &Session) -> Result<Vec<ProductRef>, ApiError>;

    /// `POST /wishlist/toggle`
    async fn toggle_wishlist(
        &self,
        session: &Session,
        product_id: &ProductId,
    ) -> Result<WishlistToggle, ApiError>;

    /// `GET /products/:id`
    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product, ApiError>;
}
