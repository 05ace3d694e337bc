//! r2fm-secrets: where sealed credentials live
//!
//! One [`r2fm_crypto::EncryptionResult`] per user, stored as JSON at
//! `{prefix}/{user_id}.json` through an OpenDAL operator. Writes replace
//! the whole record; removal deletes it.
//!
//! [`CredentialVault`] is the entry point for request handlers: it enforces
//! the passphrase policy, runs the PBKDF2-heavy codec off the async
//! executor, and talks to the [`CredentialStore`].

pub mod error;
pub mod operator;
pub mod store;
pub mod vault;

pub use error::{VaultError, VaultResult};
pub use operator::build_operator;
pub use store::CredentialStore;
pub use vault::CredentialVault;
