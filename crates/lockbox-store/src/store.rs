//! The `SecureStore` facade: encrypted values over an external blob store.
//!
//! Every logical key is namespaced as `<prefix>_<key>`; every value is the
//! base64 text of a generation-tagged AES-256-GCM blob. Construction loads
//! or creates key material through the protected channel and runs any
//! pending cipher migration to completion, under a process-wide lock, so no
//! operation can observe a half-initialized store.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;
use tracing::{debug, warn};

use lockbox_crypto::{cipher, KeyMaterial};

use crate::blob::BlobStore;
use crate::error::StoreError;
use crate::key_store::KeyMaterialStore;
use crate::keychain::ProtectedKeyChannel;
use crate::migration::{self, MigrationOutcome};

/// Namespace prefix for entries when none is configured.
pub const DEFAULT_PREFIX: &str = "lockbox";

/// Blob store slot where old installations kept their key material.
pub const DEFAULT_LEGACY_KEY_SLOT: &str = "lockbox.key.v1";

/// Serializes construction process-wide: concurrent first opens must not
/// each create a key or run the migration twice.
static OPEN_LOCK: Mutex<()> = Mutex::new(());

/// Construction options for [`SecureStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Prefix prepended (with an underscore) to every logical key.
    pub prefix: String,
    /// Blob store slot probed for legacy key material.
    pub legacy_key_slot: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            legacy_key_slot: DEFAULT_LEGACY_KEY_SLOT.to_string(),
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<(), StoreError> {
        if self.prefix.is_empty() {
            return Err(StoreError::Config("prefix must not be empty".into()));
        }
        if self.legacy_key_slot.is_empty() {
            return Err(StoreError::Config(
                "legacy key slot must not be empty".into(),
            ));
        }
        // The slot must never be enumerable (or clearable) as an entry
        if self.legacy_key_slot.starts_with(&format!("{}_", self.prefix)) {
            return Err(StoreError::Config(
                "legacy key slot must not be inside the entry namespace".into(),
            ));
        }
        Ok(())
    }
}

/// Encrypted key-value store over an external [`BlobStore`].
///
/// One logical owner per process: open it once, share it (`Send + Sync`),
/// and call operations from any thread. Operations on distinct keys do not
/// contend; concurrent writes to the same key resolve last-write-wins at
/// the blob store.
pub struct SecureStore {
    blobs: Arc<dyn BlobStore>,
    key: KeyMaterial,
    prefix: String,
    migration: Option<MigrationOutcome>,
}

impl SecureStore {
    /// Open with the default configuration.
    pub fn open(
        blobs: Arc<dyn BlobStore>,
        channel: Arc<dyn ProtectedKeyChannel>,
    ) -> Result<Self, StoreError> {
        Self::open_with(blobs, channel, StoreConfig::default())
    }

    /// Open with explicit configuration. Key setup and any pending cipher
    /// migration run to completion before this returns. A blob-store-backed
    /// key channel whose slot falls inside the entry namespace is rejected.
    pub fn open_with(
        blobs: Arc<dyn BlobStore>,
        channel: Arc<dyn ProtectedKeyChannel>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let StoreConfig {
            prefix,
            legacy_key_slot,
        } = config;

        // Same rule as the legacy slot: the key must never be enumerable
        // or clearable as an entry
        if let Some(slot) = channel.blob_slot() {
            if slot.starts_with(&format!("{}_", prefix)) {
                return Err(StoreError::Config(
                    "key channel slot must not be inside the entry namespace".into(),
                ));
            }
        }

        let _guard = OPEN_LOCK.lock();
        let keys = KeyMaterialStore::new(channel, Arc::clone(&blobs), legacy_key_slot);
        let (key, migration) = migration::run(&keys, &*blobs, &prefix)?;
        debug!(%prefix, migrated = migration.is_some(), "secure store opened");

        Ok(Self {
            blobs,
            key,
            prefix,
            migration,
        })
    }

    /// Encrypt and store a value, replacing any existing one.
    pub fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let blob = cipher::encrypt(&self.key, value.as_bytes())?;
        self.blobs
            .put(&self.namespaced(key), &STANDARD.encode(&blob))?;
        Ok(())
    }

    /// Read and decrypt a value. `None` when the key was never stored.
    /// A stored value that no longer decrypts is an error, never garbage.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.blobs.get(&self.namespaced(key))? {
            Some(stored) => Ok(Some(self.decrypt_value(&stored)?)),
            None => Ok(None),
        }
    }

    /// Decrypt every entry under this store's namespace.
    ///
    /// Entries that fail to decode or decrypt are omitted and logged, so
    /// one corrupt value cannot hide the rest.
    pub fn get_all(&self) -> Result<HashMap<String, String>, StoreError> {
        let entry_prefix = format!("{}_", self.prefix);
        let mut values = HashMap::new();
        for (slot, stored) in self.blobs.get_all()? {
            let Some(name) = slot.strip_prefix(&entry_prefix) else {
                continue;
            };
            match self.decrypt_value(&stored) {
                Ok(value) => {
                    values.insert(name.to_string(), value);
                }
                Err(e) => warn!(key = %slot, error = %e, "omitting unreadable entry"),
            }
        }
        Ok(values)
    }

    /// Remove a value. Absent keys are a no-op.
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.remove(&self.namespaced(key))?;
        Ok(())
    }

    /// Remove every entry under this store's namespace, and nothing else.
    /// Unrelated data sharing the blob store survives.
    pub fn clear(&self) -> Result<(), StoreError> {
        let entry_prefix = format!("{}_", self.prefix);
        for slot in self.blobs.get_all()?.into_keys() {
            if slot.starts_with(&entry_prefix) {
                self.blobs.remove(&slot)?;
            }
        }
        Ok(())
    }

    /// Outcome of the migration run at construction, when one ran.
    pub fn migration_outcome(&self) -> Option<&MigrationOutcome> {
        self.migration.as_ref()
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key)
    }

    fn decrypt_value(&self, stored: &str) -> Result<String, StoreError> {
        let blob = STANDARD.decode(stored.as_bytes())?;
        let plaintext = cipher::decrypt(&self.key, &blob)?;
        Ok(String::from_utf8(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(StoreConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_prefix() {
        let config = StoreConfig {
            prefix: String::new(),
            ..StoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn rejects_empty_legacy_slot() {
        let config = StoreConfig {
            legacy_key_slot: String::new(),
            ..StoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn rejects_legacy_slot_inside_namespace() {
        let config = StoreConfig {
            prefix: "app".to_string(),
            legacy_key_slot: "app_key".to_string(),
        };
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn legacy_slot_sharing_prefix_without_separator_is_fine() {
        let config = StoreConfig {
            prefix: "app".to_string(),
            legacy_key_slot: "app.key.v1".to_string(),
        };
        assert!(config.validate().is_ok());
    }
}
