//! Core types for Vitrine.
//!
//! This module provides type-safe wrappers for the storefront domain.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod wishlist;

pub use cart::{Cart, CartLineItem, CartSnapshot, DEFAULT_MAX_QUANTITY, LineKey, QuantityDelta};
pub use id::*;
pub use price::{CartSummary, CurrencyCode, Price, PricingRules};
pub use product::{LocalizedText, Product, ProductRef, Variant};
pub use wishlist::{Wishlist, WishlistEntry};
