//! Encrypted key-value preference store: AES-256-GCM values over a
//! pluggable blob store, key material in a protected channel, one-shot
//! migration from the legacy cipher generation at open.

pub mod blob;
pub mod command;
pub mod error;
pub mod key_store;
pub mod keychain;
pub mod migration;
pub mod store;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use command::{dispatch, Command, CommandError, Reply};
pub use error::{BlobStoreError, KeyStorageError, StoreError};
pub use key_store::KeyMaterialStore;
pub use keychain::{BlobStoreChannel, MemoryKeyChannel, OsKeyringChannel, ProtectedKeyChannel};
pub use migration::{MigrationError, MigrationOutcome};
pub use store::{SecureStore, StoreConfig, DEFAULT_LEGACY_KEY_SLOT, DEFAULT_PREFIX};
