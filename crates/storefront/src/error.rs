//! Store-level error taxonomy with Sentry integration.
//!
//! Remote failures arrive as [`ApiError`] and are classified into a
//! [`StoreError`] at the store boundary. A store records the error in its
//! state and publishes a notice; nothing propagates as a panic and every
//! failure leaves the previous state in place.

use thiserror::Error;

use crate::api::ApiError;

/// Error surfaced by the cart and wishlist stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No session token, or the backend rejected it.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// The backend (or the known stock level) does not allow the quantity.
    #[error("Out of stock: {0}")]
    OutOfStock(String),

    /// The referenced record no longer exists.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Quantity outside the accepted range.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// Transport failure or unexpected backend response.
    #[error("Network or server error: {0}")]
    NetworkOrServer(String),
}

impl StoreError {
    /// Whether the UI should send the user to the login page.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Short message suitable for a transient notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please log in first".to_string(),
            Self::OutOfStock(_) => "This item is out of stock".to_string(),
            Self::NotFound(_) => "This item is no longer available".to_string(),
            Self::InvalidQuantity(_) => "Please choose a valid quantity".to_string(),
            Self::NetworkOrServer(_) => "Something went wrong, please try again".to_string(),
        }
    }

    /// Capture unexpected failures to Sentry.
    ///
    /// Expected outcomes (auth, stock, missing records) are not reported.
    pub fn report(&self) {
        if matches!(self, Self::NetworkOrServer(_)) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Store operation failed"
            );
        } else {
            tracing::debug!(error = %self, "Store operation rejected");
        }
    }
}

impl From<ApiError> for StoreError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => Self::Unauthenticated,
            ApiError::OutOfStock(message) => Self::OutOfStock(message),
            ApiError::NotFound(message) => Self::NotFound(message),
            other => Self::NetworkOrServer(other.to_string()),
        }
    }
}

/// A policy name that does not match any known policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown policy: {0}")]
pub struct UnknownPolicy(pub String);

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Set the Sentry user context from a user ID.
///
/// Call this once a session is established to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Add to cart", Some(&[("product_id", "64f1c0")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
