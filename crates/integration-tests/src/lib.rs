//! Integration tests for Vitrine.
//!
//! The tests drive the real HTTP client and both stores against a
//! [`wiremock`] server standing in for the storefront backend. No running
//! services are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vitrine-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_sync` - Cart store over HTTP, including the local mirror
//! - `wishlist_sync` - Wishlist store over HTTP

use serde_json::{Value, json};
use tempfile::TempDir;
use vitrine_core::UserId;
use vitrine_storefront::{AppState, Session, StorefrontConfig};
use wiremock::MockServer;

/// Bearer token every authenticated test session carries.
pub const TOKEN: &str = "test-token";

/// User the test session belongs to.
pub const USER_ID: &str = "u-1";

/// A mocked backend plus application state wired to it.
pub struct TestContext {
    pub server: MockServer,
    pub state: AppState,
    /// Holds the mirror directory alive for the duration of the test.
    pub mirror_dir: TempDir,
}

impl TestContext {
    /// Start a mock backend and build state for a signed-in shopper.
    pub async fn new() -> Self {
        Self::with_env(&[]).await
    }

    /// Like [`TestContext::new`] with extra environment settings.
    pub async fn with_env(extra: &[(&str, &str)]) -> Self {
        let server = MockServer::start().await;
        let mirror_dir = TempDir::new().expect("Failed to create mirror dir");
        let state = state_for(&server, &mirror_dir, extra);
        state.login(session());
        Self {
            server,
            state,
            mirror_dir,
        }
    }

    /// Build a second state sharing this context's backend and mirror.
    #[must_use]
    pub fn reopen(&self) -> AppState {
        state_for(&self.server, &self.mirror_dir, &[])
    }
}

/// Configuration pointing at the mock server under an `/api` prefix.
///
/// # Panics
///
/// Panics if the configuration is rejected.
#[must_use]
pub fn config(server: &MockServer, mirror_dir: &TempDir, extra: &[(&str, &str)]) -> StorefrontConfig {
    let base_url = format!("{}/api", server.uri());
    let mirror = mirror_dir.path().to_string_lossy().into_owned();
    StorefrontConfig::from_lookup(|key| {
        if let Some((_, value)) = extra.iter().find(|(k, _)| *k == key) {
            return Some((*value).to_string());
        }
        match key {
            "VITRINE_API_BASE_URL" => Some(base_url.clone()),
            "VITRINE_MIRROR_DIR" => Some(mirror.clone()),
            _ => None,
        }
    })
    .expect("Invalid test configuration")
}

fn state_for(server: &MockServer, mirror_dir: &TempDir, extra: &[(&str, &str)]) -> AppState {
    AppState::new(config(server, mirror_dir, extra)).expect("Failed to build HTTP client")
}

/// The signed-in test session.
#[must_use]
pub fn session() -> Session {
    Session::authenticated(TOKEN, Some(UserId::new(USER_ID)))
}

/// Value of the `Authorization` header for [`TOKEN`].
#[must_use]
pub fn bearer() -> String {
    format!("Bearer {TOKEN}")
}

/// A product record with one variant per `(id, price, stock)` triple.
#[must_use]
pub fn product_json(id: &str, name: &str, variants: &[(&str, f64, u32)]) -> Value {
    let variants: Vec<Value> = variants
        .iter()
        .map(|(variant_id, price, stock)| {
            json!({"_id": variant_id, "price": price, "inStock": stock})
        })
        .collect();
    json!({
        "_id": id,
        "name": {"en": name},
        "variants": variants,
    })
}

/// A cart line as the backend returns it.
#[must_use]
pub fn line_json(id: &str, product: Value, variant_id: &str, price: f64, quantity: u32) -> Value {
    json!({
        "_id": id,
        "productId": product,
        "variantId": variant_id,
        "priceAtAddition": price,
        "quantity": quantity,
    })
}
