//! r2fm-crypto: envelope encryption for per-user storage credentials
//!
//! Key hierarchy:
//! ```text
//! Passphrase + random 16-byte salt
//!   └── KEK (256-bit, PBKDF2-HMAC-SHA256, 100k rounds)
//!         └── wraps DEK (256-bit random, one per encrypt call)
//!               AES-256-GCM, wrapped form = [12-byte IV][32-byte key + 16-byte tag]
//!               └── encrypts the credential JSON
//!                     AES-256-GCM, separate random 12-byte IV
//! ```
//!
//! Wire format is four standard-base64 strings:
//! `{encryptedCredentials, wrappedDek, salt, iv}`. Nothing else is stored;
//! the passphrase is the only input needed to open a bundle.

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod provider;

pub use cipher::{decrypt_data, encrypt_data};
pub use envelope::{CredentialBundle, EncryptionResult, EnvelopeCodec};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{derive_key, Kek, DEFAULT_ITERATIONS};
pub use keys::{generate_dek, unwrap_dek, wrap_dek, Dek};
pub use provider::{CryptoProvider, OsRandom, SeededRandom};

/// Size of a KEK or DEK in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM IV (96-bit)
pub const IV_SIZE: usize = 12;

/// Size of an AES-GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of the PBKDF2 salt
pub const SALT_SIZE: usize = 16;

/// Size of a wrapped DEK: IV || key || tag
pub const WRAPPED_DEK_SIZE: usize = IV_SIZE + KEY_SIZE + TAG_SIZE;
