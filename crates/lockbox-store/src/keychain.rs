//! The protected key channel: where current key material lives.
//!
//! The default adapter is the platform credential store (macOS Keychain,
//! Windows Credential Manager, Linux Secret Service) via the `keyring`
//! crate. A blob-store-backed channel exists as an explicit lower-assurance
//! fallback for platforms without a credential service; choosing it is a
//! construction-time policy decision, never an automatic downgrade.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;

use crate::blob::BlobStore;
use crate::error::KeyStorageError;

/// Hardware- or OS-protected storage for the current key material.
///
/// Payloads are the opaque encoded form produced by
/// [`KeyMaterial::encode`](lockbox_crypto::KeyMaterial::encode); channels
/// never interpret them. `store` replaces atomically: a reader never
/// observes an empty slot mid-replace.
pub trait ProtectedKeyChannel: Send + Sync {
    fn store(&self, material: &[u8]) -> Result<(), KeyStorageError>;

    fn load(&self) -> Result<Option<Vec<u8>>, KeyStorageError>;

    fn erase(&self) -> Result<(), KeyStorageError>;

    /// The blob store slot this channel persists into, for channels that
    /// keep the key inside a [`BlobStore`]. The store refuses to open over a
    /// slot its own namespace operations could enumerate or clear.
    fn blob_slot(&self) -> Option<&str> {
        None
    }
}

/// Key channel backed by the OS credential store.
///
/// Key bytes are base64-coded into the credential's password field. Replace
/// atomicity comes from the platform's credential upsert.
pub struct OsKeyringChannel {
    service: String,
    account: String,
}

impl OsKeyringChannel {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, KeyStorageError> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| KeyStorageError::Unavailable(e.to_string()))
    }
}

impl ProtectedKeyChannel for OsKeyringChannel {
    fn store(&self, material: &[u8]) -> Result<(), KeyStorageError> {
        let encoded = STANDARD.encode(material);
        self.entry()?
            .set_password(&encoded)
            .map_err(|e| KeyStorageError::Persist(e.to_string()))
    }

    fn load(&self) -> Result<Option<Vec<u8>>, KeyStorageError> {
        match self.entry()?.get_password() {
            Ok(encoded) => {
                let bytes = STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(|e| KeyStorageError::Corrupt(e.to_string()))?;
                Ok(Some(bytes))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KeyStorageError::Unavailable(e.to_string())),
        }
    }

    fn erase(&self) -> Result<(), KeyStorageError> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeyStorageError::Persist(e.to_string())),
        }
    }
}

/// Key channel that keeps the key inside a [`BlobStore`] slot, base64-coded.
///
/// Offers no protection beyond the blob store's own. Mirrors installations
/// that keep the key next to the data it protects; construct it only as a
/// deliberate fallback.
pub struct BlobStoreChannel {
    blobs: Arc<dyn BlobStore>,
    slot: String,
}

impl BlobStoreChannel {
    /// The slot must live outside the entry namespace of any store opened
    /// over the same blob store; `SecureStore::open*` rejects it otherwise.
    pub fn new(blobs: Arc<dyn BlobStore>, slot: impl Into<String>) -> Self {
        Self {
            blobs,
            slot: slot.into(),
        }
    }
}

impl ProtectedKeyChannel for BlobStoreChannel {
    fn store(&self, material: &[u8]) -> Result<(), KeyStorageError> {
        let encoded = STANDARD.encode(material);
        self.blobs
            .put(&self.slot, &encoded)
            .map_err(|e| KeyStorageError::Persist(e.to_string()))
    }

    fn load(&self) -> Result<Option<Vec<u8>>, KeyStorageError> {
        let encoded = self
            .blobs
            .get(&self.slot)
            .map_err(|e| KeyStorageError::Unavailable(e.to_string()))?;
        match encoded {
            Some(encoded) => {
                let bytes = STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(|e| KeyStorageError::Corrupt(e.to_string()))?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    fn erase(&self) -> Result<(), KeyStorageError> {
        self.blobs
            .remove(&self.slot)
            .map_err(|e| KeyStorageError::Persist(e.to_string()))
    }

    fn blob_slot(&self) -> Option<&str> {
        Some(&self.slot)
    }
}

/// Volatile key channel for tests.
#[derive(Default)]
pub struct MemoryKeyChannel {
    slot: Mutex<Option<Vec<u8>>>,
}

impl MemoryKeyChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProtectedKeyChannel for MemoryKeyChannel {
    fn store(&self, material: &[u8]) -> Result<(), KeyStorageError> {
        *self.slot.lock() = Some(material.to_vec());
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<u8>>, KeyStorageError> {
        Ok(self.slot.lock().clone())
    }

    fn erase(&self) -> Result<(), KeyStorageError> {
        *self.slot.lock() = None;
        Ok(())
    }
}
