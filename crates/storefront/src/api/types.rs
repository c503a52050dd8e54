//! Wire shapes of the backend's JSON bodies.
//!
//! The backend is loose about shapes: product references may be populated or
//! not, and mutation responses may wrap the line or not. These types accept
//! every shape seen in practice; `conversions` turns them into domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vitrine_core::{LineItemId, ProductId, ProductRef, VariantId};

// =============================================================================
// Responses
// =============================================================================

/// A cart line as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCartLine {
    #[serde(rename = "_id", alias = "id")]
    pub id: LineItemId,
    #[serde(alias = "product")]
    pub product_id: ProductRef,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default)]
    pub price_at_addition: Option<Decimal>,
    pub quantity: u32,
    #[serde(default)]
    pub max_quantity: Option<u32>,
}

/// `GET /cart`
#[derive(Debug, Deserialize)]
pub struct CartItemsResponse {
    #[serde(default)]
    pub items: Vec<WireCartLine>,
}

/// `POST /cart/items`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AddCartResponse {
    Cart { items: Vec<WireCartLine> },
    Wrapped { item: WireCartLine },
    Item(WireCartLine),
}

/// `PATCH /cart/items/:id`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpdateCartResponse {
    Wrapped { item: WireCartLine },
    Item(WireCartLine),
}

impl UpdateCartResponse {
    pub fn into_line(self) -> WireCartLine {
        match self {
            Self::Wrapped { item } | Self::Item(item) => item,
        }
    }
}

/// `GET /wishlist`
#[derive(Debug, Deserialize)]
pub struct WishlistResponse {
    #[serde(default)]
    pub wishlist: Vec<ProductRef>,
}

/// `POST /wishlist/toggle`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub in_wishlist: bool,
    #[serde(default)]
    pub wishlist: Vec<ProductRef>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemBody<'a> {
    pub product_id: &'a ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<&'a VariantId>,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct UpdateItemBody {
    pub delta: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBody<'a> {
    pub product_id: &'a ProductId,
}
