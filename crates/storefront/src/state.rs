//! Application state shared across the UI.

use std::sync::{Arc, PoisonError, RwLock};

use crate::api::{ApiError, HttpRemoteStore, RemoteStore};
use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::mirror::{FileMirror, LocalMirror};
use crate::notice::Notifier;
use crate::session::Session;
use crate::wishlist::WishlistStore;

/// Application state: both stores, the notifier and the current session.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    remote: Arc<dyn RemoteStore>,
    cart: CartStore,
    wishlist: WishlistStore,
    notifier: Notifier,
    session: RwLock<Session>,
}

impl AppState {
    /// Create the state with the HTTP backend and a file mirror.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> std::result::Result<Self, ApiError> {
        let remote = Arc::new(HttpRemoteStore::new(&config.api)?);
        let mirror = Arc::new(FileMirror::new(&config.mirror_dir));
        Ok(Self::with_parts(config, remote, mirror))
    }

    /// Create the state over an arbitrary backend and mirror.
    #[must_use]
    pub fn with_parts(
        config: StorefrontConfig,
        remote: Arc<dyn RemoteStore>,
        mirror: Arc<dyn LocalMirror>,
    ) -> Self {
        let notifier = Notifier::default();
        let cart = CartStore::new(
            remote.clone(),
            mirror,
            notifier.clone(),
            config.cart.clone(),
        );
        let wishlist = WishlistStore::new(remote.clone(), notifier.clone(), config.toggle_policy);
        let session = config.session.session();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                remote,
                cart,
                wishlist,
                notifier,
                session: RwLock::new(session),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The backend both stores talk to.
    #[must_use]
    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.inner.remote
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// The current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Populate both stores for the current session.
    ///
    /// The cart is restored from the mirror first. Without a user ID only the
    /// mirrored cart is shown.
    ///
    /// # Errors
    ///
    /// Returns the first store error; the other store is still loaded.
    pub async fn start(&self) -> Result<()> {
        let session = self.session();
        let cart = async {
            match session.user_id() {
                Some(user_id) => self.cart().start(&session, user_id).await,
                None => {
                    self.cart().restore_from_mirror();
                    Ok(())
                }
            }
        };
        let (cart, wishlist) = tokio::join!(cart, self.wishlist().fetch_wishlist(&session));
        cart.and(wishlist)
    }

    /// Switch to a signed-in session.
    pub fn login(&self, session: Session) {
        if let Some(user_id) = session.user_id() {
            set_sentry_user(user_id);
        }
        *self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Drop the session and every locally held copy of user data.
    pub fn logout(&self) {
        *self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Session::anonymous();
        self.cart().reset_local();
        self.wishlist().reset_local();
        clear_sentry_user();
    }
}
