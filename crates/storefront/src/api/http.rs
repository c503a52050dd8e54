//! `reqwest` implementation of [`RemoteStore`].

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use vitrine_core::{
    CartLineItem, LineItemId, Product, ProductId, ProductRef, QuantityDelta, UserId,
};

use super::conversions::{convert_add_response, convert_lines, convert_update};
use super::types::{
    AddCartResponse, AddItemBody, CartItemsResponse, ErrorBody, ToggleBody, ToggleResponse,
    UpdateCartResponse, UpdateItemBody, WishlistResponse,
};
use super::{AddCartItem, ApiError, CartLineUpdate, CartMutation, RemoteStore, WishlistToggle};
use crate::config::ApiConfig;
use crate::session::Session;

/// Longest slice of a response body written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// Client for the storefront REST backend.
///
/// Cheap to clone; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct HttpRemoteStore {
    inner: Arc<HttpRemoteStoreInner>,
}

struct HttpRemoteStoreInner {
    client: reqwest::Client,
    base_url: Url,
    products: Cache<ProductId, Product>,
}

impl HttpRemoteStore {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let products = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(HttpRemoteStoreInner {
                client: builder.build()?,
                base_url: config.base_url.clone(),
                products,
            }),
        })
    }

    /// Base URL with `segments` appended to its path.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        // Only cannot-be-a-base URLs fail here, and config rejects those
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url, session: Option<&Session>) -> RequestBuilder {
        let request = self.inner.client.request(method, url);
        match session.and_then(Session::token) {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder, resource: &str) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_failure(status, &body, resource))
        }
    }

    /// Send a request and parse the JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, ApiError> {
        let body = self.send(request, resource).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                resource,
                body = %truncate(&body, LOG_BODY_LIMIT),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    #[instrument(skip(self, session), fields(user_id = %user_id))]
    async fn fetch_cart(
        &self,
        session: &Session,
        user_id: &UserId,
    ) -> Result<Vec<CartLineItem>, ApiError> {
        let mut url = self.endpoint(&["cart"]);
        url.query_pairs_mut().append_pair("userId", user_id.as_str());

        let response: CartItemsResponse = self
            .send_json(self.request(Method::GET, url, Some(session)), "cart")
            .await?;
        debug!(lines = response.items.len(), "Fetched cart");
        convert_lines(response.items)
    }

    #[instrument(skip(self, session, item), fields(product_id = %item.product_id, quantity = item.quantity))]
    async fn add_cart_item(
        &self,
        session: &Session,
        item: &AddCartItem,
    ) -> Result<CartMutation, ApiError> {
        let body = AddItemBody {
            product_id: &item.product_id,
            variant_id: item.variant_id.as_ref(),
            quantity: item.quantity,
        };
        let request = self
            .request(Method::POST, self.endpoint(&["cart", "items"]), Some(session))
            .json(&body);

        let response: AddCartResponse = self.send_json(request, "cart item").await?;
        convert_add_response(response, item)
    }

    #[instrument(skip(self, session), fields(item_id = %item_id))]
    async fn update_cart_item(
        &self,
        session: &Session,
        item_id: &LineItemId,
        delta: QuantityDelta,
    ) -> Result<CartLineUpdate, ApiError> {
        let request = self
            .request(
                Method::PATCH,
                self.endpoint(&["cart", "items", item_id.as_str()]),
                Some(session),
            )
            .json(&UpdateItemBody {
                delta: delta.as_i32(),
            });

        let response: UpdateCartResponse = self.send_json(request, item_id.as_str()).await?;
        Ok(convert_update(&response.into_line()))
    }

    #[instrument(skip(self, session), fields(item_id = %item_id))]
    async fn remove_cart_item(
        &self,
        session: &Session,
        item_id: &LineItemId,
    ) -> Result<(), ApiError> {
        let request = self.request(
            Method::DELETE,
            self.endpoint(&["cart", "items", item_id.as_str()]),
            Some(session),
        );
        self.send(request, item_id.as_str()).await?;
        Ok(())
    }

    #[instrument(skip(self, session))]
    async fn clear_cart(&self, session: &Session) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, self.endpoint(&["cart"]), Some(session));
        self.send(request, "cart").await?;
        Ok(())
    }

    #[instrument(skip(self, session))]
    async fn fetch_wishlist(&self, session: &Session) -> Result<Vec<ProductRef>, ApiError> {
        let request = self.request(Method::GET, self.endpoint(&["wishlist"]), Some(session));
        let response: WishlistResponse = self.send_json(request, "wishlist").await?;
        debug!(entries = response.wishlist.len(), "Fetched wishlist");
        Ok(response.wishlist)
    }

    #[instrument(skip(self, session), fields(product_id = %product_id))]
    async fn toggle_wishlist(
        &self,
        session: &Session,
        product_id: &ProductId,
    ) -> Result<WishlistToggle, ApiError> {
        let request = self
            .request(
                Method::POST,
                self.endpoint(&["wishlist", "toggle"]),
                Some(session),
            )
            .json(&ToggleBody { product_id });

        let response: ToggleResponse = self.send_json(request, "wishlist").await?;
        Ok(WishlistToggle {
            in_wishlist: response.in_wishlist,
            wishlist: response.wishlist,
        })
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        if let Some(product) = self.inner.products.get(product_id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let request = self.request(
            Method::GET,
            self.endpoint(&["products", product_id.as_str()]),
            None,
        );
        let product: Product = self.send_json(request, product_id.as_str()).await?;

        self.inner
            .products
            .insert(product_id.clone(), product.clone())
            .await;

        Ok(product)
    }
}

/// Map a non-success response to an [`ApiError`].
fn classify_failure(status: StatusCode, body: &str, resource: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| truncate(body, 200));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound(resource.to_string()),
        _ if message.to_lowercase().contains("stock") => ApiError::OutOfStock(message),
        _ => {
            tracing::error!(
                status = %status,
                resource,
                body = %truncate(body, LOG_BODY_LIMIT),
                "Backend returned non-success status"
            );
            ApiError::Status {
                status: status.as_u16(),
                message,
            }
        }
    }
}

fn truncate(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}
