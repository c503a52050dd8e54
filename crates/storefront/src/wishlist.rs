//! Wishlist store.
//!
//! Entries arrive from the backend either as bare product IDs or as full
//! records. Bare IDs are hydrated with product lookups right after a fetch,
//! so the UI always deals with one shape.
//!
//! Toggles are guarded per product: a second toggle of the same product
//! while the first is in flight is either dropped or queued, depending on
//! the [`TogglePolicy`]. Confirmed toggles and fetches commit one at a
//! time, in call order.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, PoisonError};

use futures::future::join_all;
use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tracing::{debug, instrument, warn};
use vitrine_core::{ProductId, Wishlist, WishlistEntry};

use crate::api::{RemoteStore, WishlistToggle};
use crate::error::{Result, StoreError, UnknownPolicy, add_breadcrumb};
use crate::notice::Notifier;
use crate::session::Session;

/// What happens to a toggle of a product whose previous toggle is still
/// in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TogglePolicy {
    /// Drop the second toggle without calling the backend.
    #[default]
    Coalesce,
    /// Run the second toggle after the first completes.
    Queue,
}

impl FromStr for TogglePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coalesce" => Ok(Self::Coalesce),
            "queue" => Ok(Self::Queue),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// How a toggle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Dropped because a toggle of the same product was in flight.
    Coalesced,
}

/// Observable wishlist state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WishlistState {
    pub wishlist: Wishlist,
    pub loading: bool,
    pub error: Option<StoreError>,
}

/// Wishlist store.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistStoreInner>,
}

struct WishlistStoreInner {
    remote: Arc<dyn RemoteStore>,
    notifier: Notifier,
    policy: TogglePolicy,
    state: watch::Sender<WishlistState>,
    in_flight: std::sync::Mutex<HashMap<ProductId, Arc<Mutex<()>>>>,
    /// Serializes fetches against toggles so a slow fetch cannot replace
    /// membership confirmed after it started.
    writes: Mutex<()>,
}

impl WishlistStore {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>, notifier: Notifier, policy: TogglePolicy) -> Self {
        Self {
            inner: Arc::new(WishlistStoreInner {
                remote,
                notifier,
                policy,
                state: watch::Sender::new(WishlistState::default()),
                in_flight: std::sync::Mutex::new(HashMap::new()),
                writes: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> WishlistState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<WishlistEntry> {
        self.inner.state.borrow().wishlist.entries().to_vec()
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.inner.state.borrow().wishlist.contains(product_id)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WishlistState> {
        self.inner.state.subscribe()
    }

    /// Forget the in-memory wishlist (logout).
    pub fn reset_local(&self) {
        self.inner.state.send_replace(WishlistState::default());
    }

    /// Replace the wishlist with the backend's view.
    ///
    /// An anonymous session has an empty wishlist; the backend is not called.
    /// Entries whose product lookup fails are kept without details.
    ///
    /// # Errors
    ///
    /// Returns the classified backend error if the wishlist itself cannot be
    /// fetched; the previous wishlist is kept.
    #[instrument(skip(self, session))]
    pub async fn fetch_wishlist(&self, session: &Session) -> Result<()> {
        let _writes = self.inner.writes.lock().await;

        if !session.is_authenticated() {
            debug!("No session token, wishlist is empty");
            self.commit(Wishlist::clear);
            return Ok(());
        }

        self.begin();
        let refs = self
            .inner
            .remote
            .fetch_wishlist(session)
            .await
            .map_err(|e| self.fail(e.into()))?;

        let mut wishlist = Wishlist::new(refs.into_iter().map(WishlistEntry::from));
        self.hydrate(&mut wishlist).await;

        self.commit(|current| *current = wishlist);
        Ok(())
    }

    /// Flip a product's membership.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a token (no backend call); otherwise the
    /// classified backend error, with membership left as it was.
    #[instrument(skip(self, session), fields(product_id = %product_id))]
    pub async fn toggle_item(
        &self,
        session: &Session,
        product_id: &ProductId,
    ) -> Result<ToggleOutcome> {
        if let Err(err) = session.require_token() {
            return Err(self.fail(err));
        }

        let Some(guard) = self.acquire(product_id).await else {
            debug!("Toggle already in flight, coalescing");
            return Ok(ToggleOutcome::Coalesced);
        };

        let writes = self.inner.writes.lock().await;
        let result = self.toggle_confirmed(session, product_id).await;

        drop(writes);
        drop(guard);
        self.release(product_id);
        result
    }

    async fn toggle_confirmed(
        &self,
        session: &Session,
        product_id: &ProductId,
    ) -> Result<ToggleOutcome> {
        add_breadcrumb(
            "wishlist",
            "Toggle wishlist",
            Some(&[("product_id", product_id.as_str())]),
        );
        self.begin();

        let WishlistToggle {
            in_wishlist,
            wishlist,
        } = self
            .inner
            .remote
            .toggle_wishlist(session, product_id)
            .await
            .map_err(|e| self.fail(e.into()))?;

        if !in_wishlist {
            self.commit(|current| {
                current.remove_all(product_id);
            });
            self.inner.notifier.success("Removed from wishlist");
            return Ok(ToggleOutcome::Removed);
        }

        let record = wishlist
            .into_iter()
            .find(|r| r.product_id() == product_id)
            .and_then(|r| r.record().cloned());
        let entry = match record {
            Some(product) => WishlistEntry::hydrated(product),
            None => match self.inner.remote.fetch_product(product_id).await {
                Ok(product) => WishlistEntry::hydrated(product),
                Err(e) => {
                    warn!(error = %e, "Adding wishlist entry without product details");
                    WishlistEntry::bare(product_id.clone())
                }
            },
        };

        self.commit(|current| {
            if let Some(product) = entry.product.clone()
                && current.contains(&entry.product_id)
            {
                current.attach(product);
            } else {
                current.insert(entry);
            }
        });
        self.inner.notifier.success("Added to wishlist");
        Ok(ToggleOutcome::Added)
    }

    /// Fetch records for bare entries concurrently.
    async fn hydrate(&self, wishlist: &mut Wishlist) {
        let ids: Vec<ProductId> = wishlist.unhydrated().cloned().collect();
        if ids.is_empty() {
            return;
        }

        let results = join_all(ids.iter().map(|id| self.inner.remote.fetch_product(id))).await;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(product) => {
                    wishlist.attach(product);
                }
                Err(e) => warn!(
                    product_id = %id,
                    error = %e,
                    "Keeping wishlist entry without product details"
                ),
            }
        }
    }

    /// Take the per-product toggle lock according to the policy.
    ///
    /// Returns `None` when coalescing and the lock is held.
    async fn acquire(&self, product_id: &ProductId) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            in_flight.entry(product_id.clone()).or_default().clone()
        };

        match self.inner.policy {
            TogglePolicy::Coalesce => lock.try_lock_owned().ok(),
            TogglePolicy::Queue => Some(lock.lock_owned().await),
        }
    }

    /// Drop the per-product lock once nobody holds or waits for it.
    fn release(&self, product_id: &ProductId) {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if in_flight
            .get(product_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            in_flight.remove(product_id);
        }
    }

    fn begin(&self) {
        self.inner.state.send_modify(|state| state.loading = true);
    }

    fn commit(&self, change: impl FnOnce(&mut Wishlist)) {
        self.inner.state.send_modify(|state| {
            change(&mut state.wishlist);
            state.loading = false;
            state.error = None;
        });
    }

    fn fail(&self, err: StoreError) -> StoreError {
        err.report();
        self.inner.notifier.error(err.user_message());
        self.inner.state.send_modify(|state| {
            state.loading = false;
            state.error = Some(err.clone());
        });
        err
    }
}
