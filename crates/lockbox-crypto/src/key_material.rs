//! Generation-tagged symmetric key material.
//!
//! Persistence encoding: [generation marker:1][key bytes:32] = 33 bytes.
//! The raw key never leaves this crate; callers hold and persist the tagged
//! encoding only.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::CryptoError;
use crate::types::{Generation, AES_KEY_LENGTH};

/// Size of encoded key material: marker byte plus raw key.
pub const KEY_MATERIAL_ENCODED_LENGTH: usize = 1 + AES_KEY_LENGTH;

/// A 256-bit symmetric key tagged with the cipher generation that uses it.
///
/// Raw bytes are zeroed on drop and readable only inside this crate.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    #[zeroize(skip)]
    generation: Generation,
    bytes: [u8; AES_KEY_LENGTH],
}

impl KeyMaterial {
    /// Generate fresh random key material for the given generation.
    pub fn generate(generation: Generation) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; AES_KEY_LENGTH];
        getrandom::getrandom(&mut bytes).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
        Ok(Self { generation, bytes })
    }

    /// Wrap externally supplied raw key bytes.
    pub fn from_bytes(generation: Generation, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != AES_KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: AES_KEY_LENGTH,
                got: bytes.len(),
            });
        }
        let mut key = [0u8; AES_KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(Self {
            generation,
            bytes: key,
        })
    }

    /// Parse the persistence encoding: [marker:1][key:32].
    pub fn decode(encoded: &[u8]) -> Result<Self, CryptoError> {
        if encoded.len() != KEY_MATERIAL_ENCODED_LENGTH {
            return Err(CryptoError::InvalidEncodedLength {
                expected: KEY_MATERIAL_ENCODED_LENGTH,
                got: encoded.len(),
            });
        }
        let generation = Generation::from_marker(encoded[0])?;
        Self::from_bytes(generation, &encoded[1..])
    }

    /// Produce the persistence encoding: [marker:1][key:32].
    pub fn encode(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Vec::with_capacity(KEY_MATERIAL_ENCODED_LENGTH);
        out.push(self.generation.marker());
        out.extend_from_slice(&self.bytes);
        Zeroizing::new(out)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub(crate) fn bytes(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.bytes
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
