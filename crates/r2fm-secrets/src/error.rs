use r2fm_crypto::CryptoError;
use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("passphrase must be at least {min} characters")]
    WeakPassphrase { min: usize },

    #[error("no stored credentials for user {0:?}")]
    NotFound(String),

    #[error("invalid user id {0:?}")]
    InvalidUserId(String),

    #[error("storage error: {0}")]
    Store(#[from] opendal::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("crypto task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
