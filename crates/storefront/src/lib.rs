//! Vitrine storefront client library.
//!
//! Keeps a shopper's cart and wishlist in step with the storefront backend:
//! a cart store with a local write-through copy, a wishlist store, and the
//! REST client both talk to.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod mirror;
pub mod notice;
pub mod session;
pub mod state;
pub mod wishlist;

pub use api::{ApiError, HttpRemoteStore, RemoteStore};
pub use cart::{BoundaryPolicy, CartOptions, CartState, CartStore};
pub use config::StorefrontConfig;
pub use error::StoreError;
pub use mirror::{FileMirror, LocalMirror, MemoryMirror};
pub use notice::{Notice, NoticeLevel, Notifier};
pub use session::Session;
pub use state::AppState;
pub use wishlist::{ToggleOutcome, TogglePolicy, WishlistState, WishlistStore};
