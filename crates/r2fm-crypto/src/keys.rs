//! DEK generation and AES-256-GCM key wrapping under the KEK

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::Kek;
use crate::provider::CryptoProvider;
use crate::{IV_SIZE, KEY_SIZE, TAG_SIZE};

/// A single-use 256-bit data-encryption key. Zeroized on drop.
pub struct Dek {
    bytes: [u8; KEY_SIZE],
}

impl Dek {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for Dek {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Dek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dek").field("bytes", &"[REDACTED]").finish()
    }
}

/// Generate a fresh random DEK.
pub fn generate_dek(provider: &dyn CryptoProvider) -> CryptoResult<Dek> {
    let mut bytes = [0u8; KEY_SIZE];
    provider.fill_random(&mut bytes)?;
    let dek = Dek::from_bytes(bytes);
    bytes.zeroize();
    Ok(dek)
}

/// Wrap (encrypt) a DEK under the KEK.
///
/// Output: `[12-byte IV][32-byte ciphertext + 16-byte tag]`
pub fn wrap_dek(provider: &dyn CryptoProvider, kek: &Kek, dek: &Dek) -> CryptoResult<Vec<u8>> {
    let mut iv = [0u8; IV_SIZE];
    provider.fill_random(&mut iv)?;

    let cipher = Aes256Gcm::new(kek.as_bytes().into());
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), dek.as_bytes().as_ref())
        .map_err(|e| CryptoError::Provider(format!("key wrapping failed: {e}")))?;

    let mut result = Vec::with_capacity(IV_SIZE + ciphertext.len());
    result.extend_from_slice(&iv);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Unwrap (decrypt) a DEK with the KEK.
///
/// Input is the output of [`wrap_dek`]. Any failure, including a short
/// buffer or a tag mismatch, is the opaque [`CryptoError::Decryption`].
pub fn unwrap_dek(kek: &Kek, wrapped: &[u8]) -> CryptoResult<Dek> {
    if wrapped.len() < IV_SIZE + TAG_SIZE {
        return Err(CryptoError::Decryption);
    }

    let (iv, ciphertext) = wrapped.split_at(IV_SIZE);
    let cipher = Aes256Gcm::new(kek.as_bytes().into());

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| CryptoError::Decryption)?,
    );

    if plaintext.len() != KEY_SIZE {
        return Err(CryptoError::Decryption);
    }

    let mut key_bytes = [0u8; KEY_SIZE];
    key_bytes.copy_from_slice(&plaintext);
    let dek = Dek::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(dek)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OsRandom;
    use crate::WRAPPED_DEK_SIZE;

    fn test_kek() -> Kek {
        Kek::from_bytes([42u8; KEY_SIZE])
    }

    #[test]
    fn test_dek_generation() {
        let k1 = generate_dek(&OsRandom).unwrap();
        let k2 = generate_dek(&OsRandom).unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let kek = test_kek();
        let dek = generate_dek(&OsRandom).unwrap();

        let wrapped = wrap_dek(&OsRandom, &kek, &dek).unwrap();
        let unwrapped = unwrap_dek(&kek, &wrapped).unwrap();

        assert_eq!(dek.as_bytes(), unwrapped.as_bytes());
    }

    #[test]
    fn test_unwrap_wrong_kek() {
        let dek = generate_dek(&OsRandom).unwrap();
        let wrapped = wrap_dek(&OsRandom, &Kek::from_bytes([1u8; KEY_SIZE]), &dek).unwrap();

        let result = unwrap_dek(&Kek::from_bytes([2u8; KEY_SIZE]), &wrapped);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn test_wrapped_size() {
        let dek = generate_dek(&OsRandom).unwrap();
        let wrapped = wrap_dek(&OsRandom, &test_kek(), &dek).unwrap();

        // iv (12) + key (32) + tag (16) = 60
        assert_eq!(wrapped.len(), WRAPPED_DEK_SIZE);
    }

    #[test]
    fn test_wrap_uses_fresh_iv() {
        let kek = test_kek();
        let dek = generate_dek(&OsRandom).unwrap();

        let w1 = wrap_dek(&OsRandom, &kek, &dek).unwrap();
        let w2 = wrap_dek(&OsRandom, &kek, &dek).unwrap();

        assert_ne!(w1[..IV_SIZE], w2[..IV_SIZE]);
        assert_ne!(w1, w2);
    }

    #[test]
    fn test_unwrap_truncated() {
        let kek = test_kek();
        let dek = generate_dek(&OsRandom).unwrap();
        let wrapped = wrap_dek(&OsRandom, &kek, &dek).unwrap();

        for len in [0, 5, IV_SIZE, IV_SIZE + TAG_SIZE, wrapped.len() - 1] {
            let result = unwrap_dek(&kek, &wrapped[..len]);
            assert!(
                matches!(result, Err(CryptoError::Decryption)),
                "truncated to {len} bytes must fail"
            );
        }
    }

    #[test]
    fn test_unwrap_tampered_iv() {
        let kek = test_kek();
        let dek = generate_dek(&OsRandom).unwrap();
        let mut wrapped = wrap_dek(&OsRandom, &kek, &dek).unwrap();
        wrapped[0] ^= 0x01;

        assert!(matches!(unwrap_dek(&kek, &wrapped), Err(CryptoError::Decryption)));
    }

    #[test]
    fn test_unwrap_rejects_wrong_key_length() {
        // A validly-authenticated payload that is not 32 bytes must not
        // become a key.
        let kek = test_kek();
        let iv = [9u8; IV_SIZE];
        let cipher = Aes256Gcm::new(kek.as_bytes().into());
        let ct = cipher.encrypt(Nonce::from_slice(&iv), &[0u8; 16][..]).unwrap();
        let mut wrapped = iv.to_vec();
        wrapped.extend_from_slice(&ct);

        assert!(matches!(unwrap_dek(&kek, &wrapped), Err(CryptoError::Decryption)));
    }
}
