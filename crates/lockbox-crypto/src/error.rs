use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Encrypted data too short")]
    DataTooShort,

    #[error("Unknown cipher generation marker: {0}")]
    UnknownGeneration(u8),

    #[error("Invalid encoded key material length: expected {expected} bytes, got {got}")]
    InvalidEncodedLength { expected: usize, got: usize },

    #[error("Generation {key} key cannot open a generation {blob} blob")]
    GenerationMismatch { key: u8, blob: u8 },

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Random number generation failed: {0}")]
    RngFailed(String),
}
