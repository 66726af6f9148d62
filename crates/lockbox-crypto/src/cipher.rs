//! AES-256-GCM value encryption dispatching on cipher generation.
//!
//! Wire format v2 (current): [marker=2][nonce:12][ciphertext + tag]
//! Wire format v1 (legacy):  [marker=1][ciphertext + tag], key-derived nonce

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::error::CryptoError;
use crate::key_material::KeyMaterial;
use crate::legacy;
use crate::types::{Generation, AES_GCM_NONCE_LENGTH, AES_GCM_TAG_LENGTH};

/// Generate a random 12-byte nonce.
fn generate_nonce() -> Result<[u8; AES_GCM_NONCE_LENGTH], CryptoError> {
    let mut nonce = [0u8; AES_GCM_NONCE_LENGTH];
    getrandom::getrandom(&mut nonce).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(nonce)
}

/// Encrypt a value in the key's generation format.
///
/// The current generation writes [marker=2][nonce:12][ciphertext+tag] with a
/// fresh random nonce per call, so re-encrypting the same plaintext under the
/// same key never reuses a nonce.
pub fn encrypt(key: &KeyMaterial, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match key.generation() {
        Generation::Legacy => legacy::encrypt(key, plaintext),
        Generation::Current => encrypt_current(key, plaintext),
    }
}

/// Decrypt a stored blob, verifying its integrity tag.
///
/// The blob's leading marker must match the key's generation. Any failure
/// (unknown marker, mismatch, truncation, tag verification) is an error;
/// partially decrypted data is never returned.
pub fn decrypt(key: &KeyMaterial, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let generation = Generation::classify(blob)?;
    if generation != key.generation() {
        return Err(CryptoError::GenerationMismatch {
            key: key.generation().marker(),
            blob: generation.marker(),
        });
    }
    match generation {
        Generation::Legacy => legacy::decrypt(key, blob),
        Generation::Current => decrypt_current(key, blob),
    }
}

fn encrypt_current(key: &KeyMaterial, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let nonce_bytes = generate_nonce()?;
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut result = Vec::with_capacity(1 + AES_GCM_NONCE_LENGTH + ciphertext.len());
    result.push(Generation::Current.marker());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

fn decrypt_current(key: &KeyMaterial, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let min_length = 1 + AES_GCM_NONCE_LENGTH + AES_GCM_TAG_LENGTH;
    if blob.len() < min_length {
        return Err(CryptoError::DataTooShort);
    }

    let nonce = Nonce::from_slice(&blob[1..1 + AES_GCM_NONCE_LENGTH]);
    let ciphertext = &blob[1 + AES_GCM_NONCE_LENGTH..];
    let cipher = Aes256Gcm::new_from_slice(key.bytes())
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}
