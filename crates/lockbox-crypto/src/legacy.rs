//! Legacy (generation 1) value encryption.
//!
//! Wire format v1: [marker=1][ciphertext + tag]. No nonce in the blob: the
//! nonce is derived from the key itself with HKDF-SHA256, so every message
//! under one key reuses the same nonce and equal plaintexts produce equal
//! blobs. Kept to read and migrate data written by old installations; the
//! store never writes new v1 blobs.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::CryptoError;
use crate::key_material::KeyMaterial;
use crate::types::{Generation, AES_GCM_NONCE_LENGTH, AES_GCM_TAG_LENGTH};

const NONCE_INFO: &[u8] = b"lockbox legacy nonce v1";

/// Derive the fixed per-key nonce used by generation 1.
fn derive_nonce(key: &KeyMaterial) -> Result<[u8; AES_GCM_NONCE_LENGTH], CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, key.bytes());
    let mut nonce = [0u8; AES_GCM_NONCE_LENGTH];
    hk.expand(NONCE_INFO, &mut nonce)
        .map_err(|e| CryptoError::KeyDerivationFailed(format!("HKDF expand failed: {}", e)))?;
    Ok(nonce)
}

pub(crate) fn encrypt(key: &KeyMaterial, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let nonce_bytes = derive_nonce(key)?;
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut result = Vec::with_capacity(1 + ciphertext.len());
    result.push(Generation::Legacy.marker());
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Marker byte is validated by the dispatching caller.
pub(crate) fn decrypt(key: &KeyMaterial, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < 1 + AES_GCM_TAG_LENGTH {
        return Err(CryptoError::DataTooShort);
    }
    let ciphertext = &blob[1..];
    let cipher = Aes256Gcm::new_from_slice(key.bytes())
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    let nonce_bytes = derive_nonce(key)?;
    let nonce = Nonce::from_slice(&nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}
