//! Key derivation: passphrase → KEK via PBKDF2-HMAC-SHA256

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::KEY_SIZE;

/// Default PBKDF2 round count. Lowering it weakens brute-force resistance.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// A 256-bit key-encryption key derived from the user's passphrase.
///
/// Only ever used to wrap and unwrap a DEK. Zeroized on drop.
pub struct Kek {
    bytes: [u8; KEY_SIZE],
}

impl Kek {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for Kek {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Kek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kek").field("bytes", &"[REDACTED]").finish()
    }
}

/// Derive a KEK from a passphrase and salt.
///
/// Pure function of its inputs. The salt is normally 16 random bytes
/// stored next to the ciphertext; it does not need to be secret.
pub fn derive_key(passphrase: &SecretString, salt: &[u8], iterations: u32) -> CryptoResult<Kek> {
    if iterations == 0 {
        return Err(CryptoError::Provider(
            "PBKDF2 iteration count must be non-zero".into(),
        ));
    }

    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(
        passphrase.expose_secret().as_bytes(),
        salt,
        iterations,
        &mut key,
    );

    let kek = Kek::from_bytes(key);
    key.zeroize();
    Ok(kek)
}
