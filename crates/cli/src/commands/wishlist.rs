//! Wishlist commands.

use vitrine_core::ProductId;
use vitrine_storefront::{AppState, ToggleOutcome};

use super::CommandError;

/// Fetch and print the wishlist.
pub async fn show(state: &AppState) -> Result<(), CommandError> {
    state.wishlist().fetch_wishlist(&state.session()).await?;

    let entries = state.wishlist().entries();
    if entries.is_empty() {
        println!("Your wishlist is empty");
        return Ok(());
    }

    for entry in entries {
        let name = entry
            .product
            .as_ref()
            .and_then(|p| p.name.as_ref())
            .and_then(|name| name.get("en"))
            .unwrap_or("(details unavailable)");
        println!("{:<26} {name}", entry.product_id);
    }
    Ok(())
}

/// Toggle a product and report the new membership.
pub async fn toggle(state: &AppState, product_id: &str) -> Result<(), CommandError> {
    let product_id = ProductId::new(product_id);
    let outcome = state
        .wishlist()
        .toggle_item(&state.session(), &product_id)
        .await?;

    match outcome {
        ToggleOutcome::Added | ToggleOutcome::Removed => {}
        ToggleOutcome::Coalesced => println!("{product_id} is already being updated"),
    }
    Ok(())
}
