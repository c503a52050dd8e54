//! Cart commands.
//!
//! Every cart command restores the local copy and then loads the backend's
//! cart before doing anything else.

use vitrine_core::{LineItemId, Price, ProductId, QuantityDelta, VariantId};
use vitrine_storefront::{AppState, StoreError};

use super::CommandError;

/// Restore the mirrored cart and fetch the backend's.
pub async fn load(state: &AppState) -> Result<(), CommandError> {
    let session = state.session();
    match session.user_id() {
        Some(user_id) => state.cart().start(&session, user_id).await?,
        None if session.is_authenticated() => return Err(CommandError::MissingUserId),
        None => {
            state.cart().restore_from_mirror();
        }
    }
    Ok(())
}

/// Print the cart lines and the order summary.
pub fn show(state: &AppState) {
    let current = state.cart().state();
    if current.cart.is_empty() {
        println!("Your cart is empty");
        return;
    }

    let currency = state.config().cart.pricing.currency_code;
    for line in current.cart.items() {
        let variant = line.variant_id.as_ref().map_or("-", VariantId::as_str);
        println!(
            "{:<26} {} / {}  x{:<3} {:>14}",
            line.id,
            line.product_id,
            variant,
            line.quantity,
            Price::new(line.line_total(), currency).display()
        );
    }

    let summary = state.cart().summary();
    println!();
    println!("Items         {:>14}", current.cart.total_quantity());
    println!("Subtotal      {:>14}", summary.subtotal.display());
    println!("Discount      {:>14}", summary.discount.display());
    println!("Delivery      {:>14}", summary.delivery_fee.display());
    println!("Total         {:>14}", summary.total.display());

    if current.restored_from_mirror {
        println!("(showing the locally saved cart)");
    }
}

pub async fn add(
    state: &AppState,
    product_id: &str,
    variant_id: Option<&str>,
    quantity: u32,
) -> Result<(), CommandError> {
    let product = state
        .remote()
        .fetch_product(&ProductId::new(product_id))
        .await
        .map_err(StoreError::from)?;
    let variant_id = variant_id.map(VariantId::new);

    state
        .cart()
        .add_item(&state.session(), &product, variant_id.as_ref(), quantity)
        .await?;
    show(state);
    Ok(())
}

pub async fn step(
    state: &AppState,
    item_id: &str,
    delta: QuantityDelta,
) -> Result<(), CommandError> {
    state
        .cart()
        .update_quantity(&state.session(), &LineItemId::new(item_id), delta)
        .await?;
    show(state);
    Ok(())
}

pub async fn remove(state: &AppState, item_id: &str) -> Result<(), CommandError> {
    state
        .cart()
        .remove_item(&state.session(), &LineItemId::new(item_id))
        .await?;
    show(state);
    Ok(())
}

pub async fn clear(state: &AppState) -> Result<(), CommandError> {
    state.cart().clear(&state.session()).await?;
    show(state);
    Ok(())
}
