//! Conversions from wire shapes to domain types.
//!
//! Missing line fields are filled in this order: the response itself, the
//! request that produced it, then the populated product record.

use vitrine_core::{CartLineItem, DEFAULT_MAX_QUANTITY, ProductRef, Variant, VariantId};

use super::types::{AddCartResponse, WireCartLine};
use super::{AddCartItem, ApiError, CartLineUpdate, CartMutation};

/// Convert a cart line, using `request` for fields the backend left out.
pub fn convert_line(
    wire: WireCartLine,
    request: Option<&AddCartItem>,
) -> Result<CartLineItem, ApiError> {
    if wire.quantity == 0 {
        return Err(ApiError::Malformed(format!(
            "cart line {} has quantity 0",
            wire.id
        )));
    }

    let product_id = wire.product_id.product_id().clone();
    // A request only describes the line when it is for the same product
    let request = request.filter(|r| r.product_id == product_id);

    let variant_id = wire
        .variant_id
        .or_else(|| request.and_then(|r| r.variant_id.clone()))
        .or_else(|| {
            wire.product_id
                .record()
                .and_then(|p| p.first_variant())
                .map(|v| v.id.clone())
        });
    let variant = record_variant(&wire.product_id, variant_id.as_ref());

    let unit_price_at_addition = wire
        .price_at_addition
        .or_else(|| request.map(|r| r.unit_price))
        .or_else(|| variant.map(Variant::effective_price))
        .ok_or_else(|| ApiError::Malformed(format!("cart line {} has no price", wire.id)))?;

    let max_quantity = wire
        .max_quantity
        .or_else(|| variant.map(Variant::max_quantity))
        .or_else(|| request.map(|r| r.max_quantity))
        .unwrap_or(DEFAULT_MAX_QUANTITY)
        .max(wire.quantity);

    Ok(CartLineItem {
        id: wire.id,
        product_id,
        variant_id,
        unit_price_at_addition,
        quantity: wire.quantity,
        max_quantity,
    })
}

/// Convert every line of a cart listing.
pub fn convert_lines(lines: Vec<WireCartLine>) -> Result<Vec<CartLineItem>, ApiError> {
    lines.into_iter().map(|line| convert_line(line, None)).collect()
}

/// Convert an add response.
pub fn convert_add_response(
    response: AddCartResponse,
    request: &AddCartItem,
) -> Result<CartMutation, ApiError> {
    match response {
        AddCartResponse::Cart { items } => items
            .into_iter()
            .map(|line| convert_line(line, Some(request)))
            .collect::<Result<Vec<_>, _>>()
            .map(CartMutation::Cart),
        AddCartResponse::Wrapped { item } | AddCartResponse::Item(item) => {
            convert_line(item, Some(request)).map(CartMutation::Item)
        }
    }
}

/// Convert the line returned by a quantity update.
pub fn convert_update(wire: &WireCartLine) -> CartLineUpdate {
    let variant = record_variant(&wire.product_id, wire.variant_id.as_ref());
    CartLineUpdate {
        quantity: wire.quantity,
        max_quantity: wire
            .max_quantity
            .or_else(|| variant.map(Variant::max_quantity)),
    }
}

fn record_variant<'a>(
    product: &'a ProductRef,
    variant_id: Option<&VariantId>,
) -> Option<&'a Variant> {
    let record = product.record()?;
    match variant_id {
        Some(id) => record.variant(id),
        None => record.first_variant(),
    }
}
