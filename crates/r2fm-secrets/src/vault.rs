//! Save / load / remove a user's storage credentials

use r2fm_core::R2fmConfig;
use r2fm_crypto::{CredentialBundle, CryptoError, EnvelopeCodec};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{VaultError, VaultResult};
use crate::operator::build_operator;
use crate::store::{validate_user_id, CredentialStore};

const DEFAULT_MIN_PASSPHRASE_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct CredentialVault {
    codec: EnvelopeCodec,
    store: CredentialStore,
    min_passphrase_len: usize,
}

impl CredentialVault {
    pub fn new(codec: EnvelopeCodec, store: CredentialStore) -> Self {
        Self {
            codec,
            store,
            min_passphrase_len: DEFAULT_MIN_PASSPHRASE_LEN,
        }
    }

    pub fn with_min_passphrase_len(mut self, min: usize) -> Self {
        self.min_passphrase_len = min;
        self
    }

    /// Wire up operator, store and codec from a config.
    ///
    /// The config is validated here as well as at load time, so a config
    /// built or edited in code cannot lower the PBKDF2 floor.
    pub fn from_config(config: &R2fmConfig) -> VaultResult<Self> {
        config
            .validate()
            .map_err(|e| VaultError::Config(e.to_string()))?;
        let op = build_operator(&config.store)?;
        let store = CredentialStore::new(op, config.store.prefix.clone());
        let codec = EnvelopeCodec::default().with_iterations(config.crypto.pbkdf2_iterations);
        Ok(Self::new(codec, store).with_min_passphrase_len(config.crypto.min_passphrase_len))
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Seal `credentials` under `passphrase` and replace the user's record.
    pub async fn save(
        &self,
        user_id: &str,
        credentials: &CredentialBundle,
        passphrase: &SecretString,
    ) -> VaultResult<()> {
        validate_user_id(user_id)?;
        if passphrase.expose_secret().chars().count() < self.min_passphrase_len {
            return Err(VaultError::WeakPassphrase {
                min: self.min_passphrase_len,
            });
        }

        let codec = self.codec.clone();
        let credentials = credentials.clone();
        let passphrase = SecretString::from(passphrase.expose_secret().to_owned());
        let bundle =
            tokio::task::spawn_blocking(move || codec.encrypt_credentials(&credentials, &passphrase))
                .await??;

        self.store.put(user_id, &bundle).await?;
        tracing::info!(user_id, "saved encrypted credentials");
        Ok(())
    }

    /// Load and open the user's record.
    ///
    /// A wrong passphrase and a corrupted record both come back as
    /// `VaultError::Crypto(CryptoError::Decryption)`.
    pub async fn load(
        &self,
        user_id: &str,
        passphrase: &SecretString,
    ) -> VaultResult<CredentialBundle> {
        let bundle = self
            .store
            .get(user_id)
            .await?
            .ok_or_else(|| VaultError::NotFound(user_id.to_string()))?;

        let codec = self.codec.clone();
        let passphrase = SecretString::from(passphrase.expose_secret().to_owned());
        let result =
            tokio::task::spawn_blocking(move || codec.decrypt_credentials(&bundle, &passphrase))
                .await?;

        match result {
            Ok(credentials) => {
                tracing::debug!(user_id, "loaded credentials");
                Ok(credentials)
            }
            Err(e) => {
                if matches!(e, CryptoError::Decryption) {
                    tracing::warn!(user_id, "credential decryption failed");
                }
                Err(e.into())
            }
        }
    }

    pub async fn remove(&self, user_id: &str) -> VaultResult<()> {
        self.store.delete(user_id).await?;
        tracing::info!(user_id, "removed stored credentials");
        Ok(())
    }

    pub async fn exists(&self, user_id: &str) -> VaultResult<bool> {
        self.store.exists(user_id).await
    }

    pub async fn list_users(&self) -> VaultResult<Vec<String>> {
        self.store.list_users().await
    }
}
