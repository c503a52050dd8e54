//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VITRINE_API_BASE_URL` - Base URL of the storefront REST backend
//!
//! ## Optional
//! - `VITRINE_MIRROR_DIR` - Directory holding the local cart copy (default: .vitrine)
//! - `VITRINE_QUANTITY_BOUNDARY_POLICY` - `skip` or `always` (default: skip)
//! - `VITRINE_WISHLIST_TOGGLE_POLICY` - `coalesce` or `queue` (default: coalesce)
//! - `VITRINE_DISCOUNT_RATE` - Fraction taken off the subtotal (default: 0.10)
//! - `VITRINE_DELIVERY_FEE` - Flat fee for non-empty carts (default: 50)
//! - `VITRINE_PRODUCT_CACHE_TTL_SECS` - Product cache lifetime (default: 300)
//! - `VITRINE_REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: none)
//! - `VITRINE_SESSION_TOKEN` - Bearer token for the backend
//! - `VITRINE_USER_ID` - ID of the signed-in user
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;
use vitrine_core::{PricingRules, UserId};

use crate::cart::{BoundaryPolicy, CartOptions};
use crate::session::Session;
use crate::wishlist::TogglePolicy;

const DEFAULT_MIRROR_DIR: &str = ".vitrine";
const DEFAULT_PRODUCT_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend connection settings
    pub api: ApiConfig,
    /// Directory holding the local cart copy
    pub mirror_dir: PathBuf,
    /// Cart store settings
    pub cart: CartOptions,
    /// Wishlist toggle concurrency policy
    pub toggle_policy: TogglePolicy,
    /// Session credentials
    pub session: SessionConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Backend connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint is resolved against
    pub base_url: Url,
    /// Per-request timeout; `None` leaves it to the transport
    pub request_timeout: Option<Duration>,
    /// Lifetime of cached product records
    pub product_cache_ttl: Duration,
}

/// Credentials for the current user.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone, Default)]
pub struct SessionConfig {
    pub token: Option<SecretString>,
    pub user_id: Option<UserId>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl SessionConfig {
    /// The session these credentials describe.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::from_parts(self.token.clone(), self.user_id.clone())
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let api = ApiConfig {
            base_url: parse_base_url(&env.required("VITRINE_API_BASE_URL")?)?,
            request_timeout: env
                .parsed::<u64>("VITRINE_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs),
            product_cache_ttl: Duration::from_secs(
                env.parsed::<u64>("VITRINE_PRODUCT_CACHE_TTL_SECS")?
                    .unwrap_or(DEFAULT_PRODUCT_CACHE_TTL_SECS),
            ),
        };

        let defaults = PricingRules::default();
        let discount_rate = env
            .parsed::<Decimal>("VITRINE_DISCOUNT_RATE")?
            .unwrap_or(defaults.discount_rate);
        if discount_rate < Decimal::ZERO || discount_rate > Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "VITRINE_DISCOUNT_RATE".to_string(),
                "must be between 0 and 1".to_string(),
            ));
        }
        let delivery_fee = env
            .parsed::<Decimal>("VITRINE_DELIVERY_FEE")?
            .unwrap_or(defaults.delivery_fee);
        if delivery_fee < Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "VITRINE_DELIVERY_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let cart = CartOptions {
            boundary_policy: env
                .parsed::<BoundaryPolicy>("VITRINE_QUANTITY_BOUNDARY_POLICY")?
                .unwrap_or_default(),
            pricing: PricingRules {
                discount_rate,
                delivery_fee,
                ..defaults
            },
        };

        Ok(Self {
            api,
            mirror_dir: PathBuf::from(env.or_default("VITRINE_MIRROR_DIR", DEFAULT_MIRROR_DIR)),
            cart,
            toggle_policy: env
                .parsed::<TogglePolicy>("VITRINE_WISHLIST_TOGGLE_POLICY")?
                .unwrap_or_default(),
            session: SessionConfig {
                token: env.optional("VITRINE_SESSION_TOKEN").map(SecretString::from),
                user_id: env.optional("VITRINE_USER_ID").map(UserId::new),
            },
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse an optional variable.
    fn parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }
}

/// Parse the backend base URL; only http(s) URLs are accepted.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid =
        |reason: String| ConfigError::InvalidEnvVar("VITRINE_API_BASE_URL".to_string(), reason);

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("VITRINE_API_BASE_URL", "https://api.example.com")]).unwrap();

        assert_eq!(config.api.base_url.as_str(), "https://api.example.com/");
        assert_eq!(config.api.request_timeout, None);
        assert_eq!(config.api.product_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.mirror_dir, PathBuf::from(".vitrine"));
        assert_eq!(config.cart.boundary_policy, BoundaryPolicy::SkipRemote);
        assert_eq!(config.cart.pricing, PricingRules::default());
        assert_eq!(config.toggle_policy, TogglePolicy::Coalesce);
        assert!(!config.session.session().is_authenticated());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_base_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "VITRINE_API_BASE_URL"));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = load(&[("VITRINE_API_BASE_URL", "mailto:shop@example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(..)));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("VITRINE_API_BASE_URL", "http://localhost:5000/api"),
            ("VITRINE_QUANTITY_BOUNDARY_POLICY", "always"),
            ("VITRINE_WISHLIST_TOGGLE_POLICY", "queue"),
            ("VITRINE_DISCOUNT_RATE", "0.25"),
            ("VITRINE_DELIVERY_FEE", "0"),
            ("VITRINE_REQUEST_TIMEOUT_SECS", "15"),
            ("VITRINE_SESSION_TOKEN", "tok"),
            ("VITRINE_USER_ID", "u-1"),
        ])
        .unwrap();

        assert_eq!(config.cart.boundary_policy, BoundaryPolicy::AlwaysCallRemote);
        assert_eq!(config.toggle_policy, TogglePolicy::Queue);
        assert_eq!(config.cart.pricing.discount_rate, Decimal::new(25, 2));
        assert_eq!(config.cart.pricing.delivery_fee, Decimal::ZERO);
        assert_eq!(config.api.request_timeout, Some(Duration::from_secs(15)));

        let session = config.session.session();
        assert_eq!(session.token().unwrap().expose_secret(), "tok");
        assert_eq!(session.user_id(), Some(&UserId::new("u-1")));
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("VITRINE_QUANTITY_BOUNDARY_POLICY", "sometimes"),
            ("VITRINE_DISCOUNT_RATE", "1.5"),
            ("VITRINE_DELIVERY_FEE", "-1"),
            ("VITRINE_PRODUCT_CACHE_TTL_SECS", "soon"),
        ] {
            let err = load(&[("VITRINE_API_BASE_URL", "https://api.example.com"), (key, value)])
                .unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidEnvVar(k, _) if k == key),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn test_session_config_debug_redacts_token() {
        let config = SessionConfig {
            token: Some(SecretString::from("super_secret_token")),
            user_id: Some(UserId::new("u-1")),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token"));
    }
}
