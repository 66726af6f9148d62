use thiserror::Error;

/// Failure inside a [`BlobStore`](crate::blob::BlobStore) implementation.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("Blob store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob store document malformed: {0}")]
    Document(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Failure inside a [`ProtectedKeyChannel`](crate::keychain::ProtectedKeyChannel).
///
/// Any of these during store construction is fatal: the store never falls
/// back to a weaker key location on its own.
#[derive(Debug, Error)]
pub enum KeyStorageError {
    #[error("Protected key channel unavailable: {0}")]
    Unavailable(String),

    #[error("Persisted key material is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to persist key material: {0}")]
    Persist(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] lockbox_crypto::CryptoError),

    #[error("Key storage error: {0}")]
    KeyStorage(#[from] KeyStorageError),

    #[error("Blob store error: {0}")]
    Backend(#[from] BlobStoreError),

    #[error("Stored value is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Decrypted value is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid store configuration: {0}")]
    Config(String),
}
