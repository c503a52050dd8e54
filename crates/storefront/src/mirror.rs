//! Write-through local copy of the cart.
//!
//! The cart store saves a [`CartSnapshot`] after every committed change and
//! loads it on start, so the cart shows up before the backend answers.
//! The backend's view always wins once it arrives.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use vitrine_core::CartSnapshot;

/// Key the cart snapshot is stored under.
pub const STORAGE_KEY: &str = "cart";

/// Errors reading or writing the local copy.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Mirror I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mirror serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Synchronous key-value slot holding the cart snapshot.
pub trait LocalMirror: Send + Sync {
    /// The stored snapshot, or `None` when nothing has been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read or does not parse.
    fn load(&self) -> Result<Option<CartSnapshot>, MirrorError>;

    /// Overwrite the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn save(&self, snapshot: &CartSnapshot) -> Result<(), MirrorError>;

    /// Remove the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be removed.
    fn clear(&self) -> Result<(), MirrorError>;
}

/// Snapshot kept as `<dir>/cart.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileMirror {
    path: PathBuf,
}

impl FileMirror {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalMirror for FileMirror {
    fn load(&self) -> Result<Option<CartSnapshot>, MirrorError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    // Blocking write: the snapshot must be on disk before the commit returns.
    fn save(&self, snapshot: &CartSnapshot) -> Result<(), MirrorError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(snapshot)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), MirrorError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// In-process slot holding the serialized snapshot.
///
/// Share one instance between store instances to simulate a reload.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    slot: Mutex<Option<String>>,
}

impl MemoryMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put raw text in the slot, bypassing serialization.
    pub fn put_raw(&self, raw: impl Into<String>) {
        *self.slot() = Some(raw.into());
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalMirror for MemoryMirror {
    fn load(&self) -> Result<Option<CartSnapshot>, MirrorError> {
        self.slot()
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(MirrorError::from)
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), MirrorError> {
        let raw = serde_json::to_string(snapshot)?;
        *self.slot() = Some(raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), MirrorError> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use vitrine_core::{Cart, CartLineItem, LineItemId, ProductId, VariantId};

    use super::*;

    fn cart() -> Cart {
        Cart::new(vec![CartLineItem {
            id: LineItemId::new("l-1"),
            product_id: ProductId::new("p-1"),
            variant_id: Some(VariantId::new("v-1")),
            unit_price_at_addition: Decimal::new(1999, 2),
            quantity: 2,
            max_quantity: 5,
        }])
    }

    #[test]
    fn test_file_mirror_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::new(dir.path().join("state"));

        assert!(mirror.load().unwrap().is_none());

        mirror.save(&CartSnapshot::of(&cart())).unwrap();
        assert!(mirror.path().ends_with("cart.json"));

        let loaded = mirror.load().unwrap().unwrap();
        assert_eq!(loaded.into_cart(), cart());
    }

    #[test]
    fn test_file_mirror_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::new(dir.path());

        mirror.save(&CartSnapshot::of(&cart())).unwrap();
        mirror.clear().unwrap();
        mirror.clear().unwrap();
        assert!(mirror.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::new(dir.path());
        std::fs::write(mirror.path(), "{not json").unwrap();

        assert!(matches!(mirror.load(), Err(MirrorError::Serde(_))));
    }

    #[test]
    fn test_memory_mirror_round_trip() {
        let mirror = MemoryMirror::new();
        mirror.save(&CartSnapshot::of(&cart())).unwrap();
        assert_eq!(mirror.load().unwrap().unwrap().into_cart(), cart());

        mirror.clear().unwrap();
        assert!(mirror.load().unwrap().is_none());
    }
}
