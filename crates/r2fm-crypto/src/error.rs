use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Failure kinds surfaced by the envelope codec.
///
/// Every cryptographic verification failure collapses into
/// [`CryptoError::Decryption`]: a wrong passphrase, a flipped bit and a
/// truncated field are indistinguishable to the caller.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Malformed input detected before any cryptographic work (bad base64,
    /// wrong bundle shape).
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("decryption failed: wrong passphrase or corrupted data")]
    Decryption,

    /// Authenticated plaintext that is not a credential bundle.
    #[error("credential payload could not be parsed: {0}")]
    Parse(String),

    /// RNG or primitive failure. Never retried.
    #[error("crypto provider failure: {0}")]
    Provider(String),
}

impl CryptoError {
    pub(crate) fn invalid(field: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.to_string(),
        }
    }
}
