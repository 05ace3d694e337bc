//! AES-256-GCM data path for the credential payload
//!
//! Ciphertext layout is the standard AEAD output: `[ciphertext][16-byte tag]`.
//! The IV travels separately (the `iv` field of the bundle).

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::Dek;
use crate::provider::CryptoProvider;
use crate::IV_SIZE;

/// Encrypt `plaintext` under `key`.
///
/// When `iv` is `None` a fresh random IV is drawn from `provider`. Returns
/// the ciphertext (tag appended) and the IV that was used.
pub fn encrypt_data(
    provider: &dyn CryptoProvider,
    key: &Dek,
    plaintext: &str,
    iv: Option<[u8; IV_SIZE]>,
) -> CryptoResult<(Vec<u8>, [u8; IV_SIZE])> {
    let iv = match iv {
        Some(iv) => iv,
        None => {
            let mut fresh = [0u8; IV_SIZE];
            provider.fill_random(&mut fresh)?;
            fresh
        }
    };

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| CryptoError::Provider(format!("data encryption failed: {e}")))?;

    Ok((ciphertext, iv))
}

/// Decrypt and authenticate `ciphertext`.
///
/// Nothing is returned unless the tag verifies. The plaintext buffer is
/// wiped when the returned value is dropped.
pub fn decrypt_data(
    key: &Dek,
    ciphertext: &[u8],
    iv: &[u8; IV_SIZE],
) -> CryptoResult<Zeroizing<String>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::Decryption)?;

    String::from_utf8(plaintext)
        .map(Zeroizing::new)
        .map_err(|e| {
            e.into_bytes().zeroize();
            CryptoError::Parse("decrypted payload is not UTF-8".into())
        })
}
