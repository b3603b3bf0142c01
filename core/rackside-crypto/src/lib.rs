//! Encryption layer for Rackside.
//!
//! Provides the primitives the license store is built on:
//! - Argon2id key derivation from a machine-bound secret
//! - ChaCha20-Poly1305 authenticated encryption
//!
//! The store derives its file key from the hardware fingerprint, so a
//! license file copied to another machine cannot be decrypted.

mod cipher;
mod error;
mod key;

pub use cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, generate_random_key, DerivedKey, KdfParams, Salt, KEY_SIZE, SALT_SIZE};
