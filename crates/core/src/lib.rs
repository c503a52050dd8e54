//! Vitrine Core - Shared domain types.
//!
//! This crate provides the types shared by the Vitrine components:
//! - `storefront` - Cart and wishlist stores synchronized with the REST backend
//! - `cli` - Command-line consumer of the stores
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no persistence. Merging rules, wishlist membership and cart totals
//! live here so they can be tested without a backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, products, cart line items, wishlist entries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
