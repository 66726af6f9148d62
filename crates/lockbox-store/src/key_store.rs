//! Key material persistence across the protected channel and the legacy slot.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lockbox_crypto::{Generation, KeyMaterial};

use crate::blob::BlobStore;
use crate::error::{KeyStorageError, StoreError};
use crate::keychain::ProtectedKeyChannel;

/// Persists and retrieves the store's symmetric key material.
///
/// The current key lives in the [`ProtectedKeyChannel`]. Old installations
/// kept their key base64-coded in a reserved blob store slot next to the
/// data it protects; that slot is probed, and after a successful migration
/// erased, by the migration coordinator.
pub struct KeyMaterialStore {
    channel: Arc<dyn ProtectedKeyChannel>,
    blobs: Arc<dyn BlobStore>,
    legacy_slot: String,
}

impl KeyMaterialStore {
    pub fn new(
        channel: Arc<dyn ProtectedKeyChannel>,
        blobs: Arc<dyn BlobStore>,
        legacy_slot: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            blobs,
            legacy_slot: legacy_slot.into(),
        }
    }

    /// Load the current key from the channel, if one is present.
    pub fn load_current(&self) -> Result<Option<KeyMaterial>, StoreError> {
        let Some(encoded) = self.channel.load()? else {
            return Ok(None);
        };
        let key = KeyMaterial::decode(&encoded)
            .map_err(|e| KeyStorageError::Corrupt(e.to_string()))?;
        if key.generation() != Generation::Current {
            return Err(KeyStorageError::Corrupt(format!(
                "channel holds generation {} key material",
                key.generation().marker()
            ))
            .into());
        }
        Ok(Some(key))
    }

    /// Load the current key, or generate, persist, and return a fresh one.
    pub fn load_or_create(&self) -> Result<KeyMaterial, StoreError> {
        if let Some(key) = self.load_current()? {
            return Ok(key);
        }
        let key = KeyMaterial::generate(Generation::Current)?;
        self.replace(&key)?;
        Ok(key)
    }

    /// Probe the legacy blob store slot without consuming it.
    pub fn load_legacy_if_present(&self) -> Result<Option<KeyMaterial>, StoreError> {
        let Some(encoded) = self.blobs.get(&self.legacy_slot)? else {
            return Ok(None);
        };
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| KeyStorageError::Corrupt(e.to_string()))?;
        let key = KeyMaterial::decode(&bytes)
            .map_err(|e| KeyStorageError::Corrupt(e.to_string()))?;
        if key.generation() != Generation::Legacy {
            return Err(KeyStorageError::Corrupt(format!(
                "legacy slot holds generation {} key material",
                key.generation().marker()
            ))
            .into());
        }
        Ok(Some(key))
    }

    /// Persist `key` as the current key material, superseding any prior one.
    pub fn replace(&self, key: &KeyMaterial) -> Result<(), StoreError> {
        self.channel.store(&key.encode())?;
        Ok(())
    }

    /// Erase the legacy slot. This is the migration commit point: once the
    /// slot is gone, migration never runs again.
    pub fn remove_legacy(&self) -> Result<(), StoreError> {
        self.blobs.remove(&self.legacy_slot)?;
        Ok(())
    }
}
