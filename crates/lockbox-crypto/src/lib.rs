pub mod cipher;
pub mod error;
pub mod key_material;
mod legacy;
pub mod types;

pub use cipher::{decrypt, encrypt};
pub use error::CryptoError;
pub use key_material::{KeyMaterial, KEY_MATERIAL_ENCODED_LENGTH};
pub use types::{Generation, AES_GCM_NONCE_LENGTH, AES_GCM_TAG_LENGTH, AES_KEY_LENGTH};
