//! Shared constants and the cipher generation tag.

use crate::error::CryptoError;

/// AES-256 key size in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-GCM nonce size in bytes.
pub const AES_GCM_NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag size in bytes.
pub const AES_GCM_TAG_LENGTH: usize = 16;

/// The cipher generation a piece of key material or ciphertext belongs to.
///
/// Every persisted blob (ciphertext or encoded key material) starts with the
/// generation's one-byte marker, so stored data classifies itself without any
/// out-of-band state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// AES-256-GCM with a nonce derived from the key. One fixed nonce per
    /// key, which leaks plaintext equality across rewrites. Read and
    /// migrated away from, never written by the store.
    Legacy,
    /// AES-256-GCM with a fresh random nonce per encryption.
    Current,
}

impl Generation {
    /// The marker byte written at the front of every blob of this generation.
    pub const fn marker(self) -> u8 {
        match self {
            Generation::Legacy => 1,
            Generation::Current => 2,
        }
    }

    /// Map a marker byte back to its generation.
    pub fn from_marker(marker: u8) -> Result<Self, CryptoError> {
        match marker {
            1 => Ok(Generation::Legacy),
            2 => Ok(Generation::Current),
            other => Err(CryptoError::UnknownGeneration(other)),
        }
    }

    /// Classify a stored blob by its leading marker byte.
    pub fn classify(blob: &[u8]) -> Result<Self, CryptoError> {
        match blob.first() {
            Some(&marker) => Self::from_marker(marker),
            None => Err(CryptoError::DataTooShort),
        }
    }
}
