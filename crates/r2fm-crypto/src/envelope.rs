//! Credential envelope: the four-field bundle and the codec that seals it
//!
//! ```text
//! encrypt: salt ← rng(16)
//!          KEK  ← PBKDF2(passphrase, salt)
//!          DEK  ← rng(32)
//!          (encryptedCredentials, iv) ← AES-GCM(DEK, json(credentials))
//!          wrappedDek ← iv' || AES-GCM(KEK, DEK)
//! decrypt: the same steps in reverse
//! ```

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::cipher::{decrypt_data, encrypt_data};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, DEFAULT_ITERATIONS};
use crate::keys::{generate_dek, unwrap_dek, wrap_dek};
use crate::provider::{CryptoProvider, OsRandom};
use crate::{IV_SIZE, SALT_SIZE};

/// Plaintext storage credentials for one user.
///
/// Lives only in memory for the duration of an encrypt/decrypt call and is
/// wiped on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CredentialBundle {
    pub account_id: String,
    pub api_token: String,
    pub r2_access_key: String,
    pub r2_secret_key: String,
}

impl CredentialBundle {
    pub fn new(
        account_id: impl Into<String>,
        api_token: impl Into<String>,
        r2_access_key: impl Into<String>,
        r2_secret_key: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
            r2_access_key: r2_access_key.into(),
            r2_secret_key: r2_secret_key.into(),
        }
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("account_id", &self.account_id)
            .field("api_token", &"[REDACTED]")
            .field("r2_access_key", &"[REDACTED]")
            .field("r2_secret_key", &"[REDACTED]")
            .finish()
    }
}

/// The persisted envelope. Every field is standard base64 (padded, no
/// line wrapping) and every field is regenerated on each encrypt call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncryptionResult {
    /// AES-GCM ciphertext + tag of the credential JSON, under the DEK
    pub encrypted_credentials: String,
    /// `[12-byte IV][DEK ciphertext + tag]`, under the KEK
    pub wrapped_dek: String,
    /// 16-byte PBKDF2 salt
    pub salt: String,
    /// 12-byte IV for `encrypted_credentials`
    pub iv: String,
}

/// Raw bytes of an [`EncryptionResult`], after base64 validation.
struct DecodedEnvelope {
    ciphertext: Vec<u8>,
    wrapped_dek: Vec<u8>,
    salt: Vec<u8>,
    iv: Vec<u8>,
}

impl EncryptionResult {
    pub fn to_json(&self) -> CryptoResult<String> {
        serde_json::to_string(self)
            .map_err(|e| CryptoError::Provider(format!("bundle serialization: {e}")))
    }

    /// Parse a stored bundle. A document with missing, extra or non-string
    /// fields is rejected as invalid input.
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json).map_err(|e| CryptoError::invalid("bundle", e))
    }

    /// Decode all four fields. Runs before any key derivation so that
    /// malformed input never reaches a primitive.
    fn decode(&self) -> CryptoResult<DecodedEnvelope> {
        Ok(DecodedEnvelope {
            ciphertext: base64_decode("encryptedCredentials", &self.encrypted_credentials)?,
            wrapped_dek: base64_decode("wrappedDek", &self.wrapped_dek)?,
            salt: base64_decode("salt", &self.salt)?,
            iv: base64_decode("iv", &self.iv)?,
        })
    }
}

/// Seals and opens [`CredentialBundle`]s.
///
/// Stateless apart from its randomness source and the PBKDF2 round count,
/// so a single codec can be cloned and shared across threads.
#[derive(Clone)]
pub struct EnvelopeCodec {
    provider: Arc<dyn CryptoProvider>,
    iterations: u32,
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new(Arc::new(OsRandom))
    }
}

impl std::fmt::Debug for EnvelopeCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeCodec")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl EnvelopeCodec {
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            provider,
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Override the PBKDF2 round count. Encrypt and decrypt must agree;
    /// the count is not recorded in the bundle.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn encrypt_credentials(
        &self,
        credentials: &CredentialBundle,
        passphrase: &SecretString,
    ) -> CryptoResult<EncryptionResult> {
        let provider = self.provider.as_ref();

        let mut salt = [0u8; SALT_SIZE];
        provider.fill_random(&mut salt)?;

        let kek = derive_key(passphrase, &salt, self.iterations)?;
        let dek = generate_dek(provider)?;

        let json = Zeroizing::new(
            serde_json::to_string(credentials)
                .map_err(|e| CryptoError::Provider(format!("credential serialization: {e}")))?,
        );
        let (ciphertext, iv) = encrypt_data(provider, &dek, &json, None)?;
        let wrapped = wrap_dek(provider, &kek, &dek)?;

        tracing::debug!(
            ciphertext_len = ciphertext.len(),
            iterations = self.iterations,
            "sealed credential envelope"
        );

        Ok(EncryptionResult {
            encrypted_credentials: base64_encode(&ciphertext),
            wrapped_dek: base64_encode(&wrapped),
            salt: base64_encode(&salt),
            iv: base64_encode(&iv),
        })
    }

    /// Open a bundle.
    ///
    /// Every cryptographic failure is [`CryptoError::Decryption`] and is
    /// only reported after the KDF has run, so a truncated field costs the
    /// same as a wrong passphrase.
    pub fn decrypt_credentials(
        &self,
        bundle: &EncryptionResult,
        passphrase: &SecretString,
    ) -> CryptoResult<CredentialBundle> {
        let decoded = bundle.decode()?;

        let kek = derive_key(passphrase, &decoded.salt, self.iterations)?;
        if decoded.salt.len() != SALT_SIZE {
            return Err(CryptoError::Decryption);
        }

        let dek = unwrap_dek(&kek, &decoded.wrapped_dek)?;

        let iv: [u8; IV_SIZE] = decoded
            .iv
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::Decryption)?;
        let json = decrypt_data(&dek, &decoded.ciphertext, &iv)?;

        // serde_json messages quote the offending input; keep it out of errors
        let credentials = serde_json::from_str::<CredentialBundle>(&json)
            .map_err(|_| CryptoError::Parse("decrypted payload is not a credential bundle".into()))?;

        tracing::debug!(ciphertext_len = decoded.ciphertext.len(), "opened credential envelope");
        Ok(credentials)
    }
}

fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

fn base64_decode(field: &'static str, s: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| CryptoError::invalid(field, format!("base64 decode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SeededRandom;
    use crate::{TAG_SIZE, WRAPPED_DEK_SIZE};

    fn fast_codec() -> EnvelopeCodec {
        EnvelopeCodec::default().with_iterations(1_000)
    }

    fn sample() -> CredentialBundle {
        CredentialBundle::new("acct123", "tok_abc", "ak_1", "sk_1")
    }

    #[test]
    fn test_default_codec_uses_100k_rounds() {
        assert_eq!(EnvelopeCodec::default().iterations(), 100_000);
    }

    #[test]
    fn test_roundtrip() {
        let codec = fast_codec();
        let pw = SecretString::from("pw-123456");

        let bundle = codec.encrypt_credentials(&sample(), &pw).unwrap();
        let opened = codec.decrypt_credentials(&bundle, &pw).unwrap();

        assert_eq!(opened, sample());
    }

    #[test]
    fn test_field_sizes() {
        let codec = fast_codec();
        let bundle = codec
            .encrypt_credentials(&sample(), &SecretString::from("pw"))
            .unwrap();

        assert_eq!(STANDARD.decode(&bundle.salt).unwrap().len(), SALT_SIZE);
        assert_eq!(STANDARD.decode(&bundle.iv).unwrap().len(), IV_SIZE);
        assert_eq!(
            STANDARD.decode(&bundle.wrapped_dek).unwrap().len(),
            WRAPPED_DEK_SIZE
        );
        let json_len = serde_json::to_string(&sample()).unwrap().len();
        assert_eq!(
            STANDARD.decode(&bundle.encrypted_credentials).unwrap().len(),
            json_len + TAG_SIZE
        );
    }

    #[test]
    fn test_credential_json_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["accountId", "apiToken", "r2AccessKey", "r2SecretKey"]);
    }

    #[test]
    fn test_bundle_json_field_names() {
        let bundle = fast_codec()
            .encrypt_credentials(&sample(), &SecretString::from("pw"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&bundle.to_json().unwrap()).unwrap();
        for key in ["encryptedCredentials", "wrappedDek", "salt", "iv"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_from_json_rejects_wrong_shape() {
        let missing = r#"{"encryptedCredentials":"AA==","wrappedDek":"AA==","salt":"AA=="}"#;
        let extra = r#"{"encryptedCredentials":"AA==","wrappedDek":"AA==","salt":"AA==","iv":"AA==","v":2}"#;
        let wrong_type = r#"{"encryptedCredentials":1,"wrappedDek":"AA==","salt":"AA==","iv":"AA=="}"#;

        for json in [missing, extra, wrong_type, "not json"] {
            assert!(
                matches!(
                    EncryptionResult::from_json(json),
                    Err(CryptoError::InvalidInput { field: "bundle", .. })
                ),
                "{json} must be rejected"
            );
        }
    }

    #[test]
    fn test_seeded_provider_is_reproducible() {
        let pw = SecretString::from("pw");
        let a = EnvelopeCodec::new(Arc::new(SeededRandom::new(42)))
            .with_iterations(1_000)
            .encrypt_credentials(&sample(), &pw)
            .unwrap();
        let b = EnvelopeCodec::new(Arc::new(SeededRandom::new(42)))
            .with_iterations(1_000)
            .encrypt_credentials(&sample(), &pw)
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_iteration_mismatch_fails() {
        let pw = SecretString::from("pw");
        let bundle = fast_codec().encrypt_credentials(&sample(), &pw).unwrap();

        let other = EnvelopeCodec::default().with_iterations(1_001);
        assert!(matches!(
            other.decrypt_credentials(&bundle, &pw),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn test_short_salt_is_opaque_failure() {
        let codec = fast_codec();
        let pw = SecretString::from("pw");
        let mut bundle = codec.encrypt_credentials(&sample(), &pw).unwrap();
        bundle.salt = STANDARD.encode([0u8; 8]);

        assert!(matches!(
            codec.decrypt_credentials(&bundle, &pw),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn test_wrong_iv_length_is_opaque_failure() {
        let codec = fast_codec();
        let pw = SecretString::from("pw");
        let mut bundle = codec.encrypt_credentials(&sample(), &pw).unwrap();
        bundle.iv = STANDARD.encode([0u8; 16]);

        assert!(matches!(
            codec.decrypt_credentials(&bundle, &pw),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn test_authenticated_non_credential_payload_is_parse_failure() {
        // Build a bundle by hand whose plaintext authenticates but is not a
        // credential object.
        let provider = OsRandom;
        let pw = SecretString::from("pw");
        let salt = [5u8; SALT_SIZE];
        let kek = derive_key(&pw, &salt, 1_000).unwrap();
        let dek = generate_dek(&provider).unwrap();
        let (ct, iv) = encrypt_data(&provider, &dek, r#"{"accountId":"only"}"#, None).unwrap();
        let wrapped = wrap_dek(&provider, &kek, &dek).unwrap();

        let bundle = EncryptionResult {
            encrypted_credentials: base64_encode(&ct),
            wrapped_dek: base64_encode(&wrapped),
            salt: base64_encode(&salt),
            iv: base64_encode(&iv),
        };

        assert!(matches!(
            fast_codec().decrypt_credentials(&bundle, &pw),
            Err(CryptoError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_failure_does_not_echo_plaintext() {
        let provider = OsRandom;
        let pw = SecretString::from("pw");
        let salt = [6u8; SALT_SIZE];
        let kek = derive_key(&pw, &salt, 1_000).unwrap();
        let dek = generate_dek(&provider).unwrap();
        let payload = r#"{"accountId":"a","apiToken":"b","r2AccessKey":"c","r2SecretKey":"d","leakyFieldName":"topsecret"}"#;
        let (ct, iv) = encrypt_data(&provider, &dek, payload, None).unwrap();
        let wrapped = wrap_dek(&provider, &kek, &dek).unwrap();

        let bundle = EncryptionResult {
            encrypted_credentials: base64_encode(&ct),
            wrapped_dek: base64_encode(&wrapped),
            salt: base64_encode(&salt),
            iv: base64_encode(&iv),
        };

        let err = fast_codec().decrypt_credentials(&bundle, &pw).unwrap_err();
        assert!(matches!(err, CryptoError::Parse(_)));
        let msg = format!("{err} {err:?}");
        assert!(!msg.contains("leakyFieldName"), "{msg}");
        assert!(!msg.contains("topsecret"), "{msg}");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let dbg = format!("{:?}", sample());
        assert!(dbg.contains("acct123"));
        assert!(!dbg.contains("tok_abc"));
        assert!(!dbg.contains("sk_1"));
    }

    #[test]
    fn test_base64_is_standard_alphabet() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet
        assert_eq!(base64_encode(&[0xfb, 0xff]), "+/8=");
        assert!(base64_decode("iv", "-_8=").is_err(), "url-safe alphabet must be rejected");
        assert!(base64_decode("iv", "AAAA\nAAAA").is_err(), "line wrapping must be rejected");
    }
}
