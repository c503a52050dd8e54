//! Explicit session context passed into every store operation.
//!
//! Stores never look up credentials on their own: the caller owns the
//! session and hands it to each operation.

use secrecy::SecretString;
use vitrine_core::UserId;

use crate::error::StoreError;

/// The caller's identity for a single operation.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone, Default)]
pub struct Session {
    token: Option<SecretString>,
    user_id: Option<UserId>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl Session {
    /// A session without credentials.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session carrying a bearer token and, when known, the user's ID.
    #[must_use]
    pub fn authenticated(token: impl Into<String>, user_id: Option<UserId>) -> Self {
        Self {
            token: Some(SecretString::from(token.into())),
            user_id,
        }
    }

    /// Build a session from optional parts; an absent token is anonymous.
    #[must_use]
    pub const fn from_parts(token: Option<SecretString>, user_id: Option<UserId>) -> Self {
        Self { token, user_id }
    }

    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The token, or `Unauthenticated` when there is none.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unauthenticated` for an anonymous session.
    pub fn require_token(&self) -> Result<&SecretString, StoreError> {
        self.token.as_ref().ok_or(StoreError::Unauthenticated)
    }
}
