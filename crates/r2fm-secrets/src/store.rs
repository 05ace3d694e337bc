//! Per-user sealed-credential records

use opendal::{ErrorKind, Operator};
use r2fm_crypto::{CryptoError, EncryptionResult};

use crate::error::{VaultError, VaultResult};

const MAX_USER_ID_LEN: usize = 128;

/// Reads and writes one [`EncryptionResult`] per user id.
///
/// The store never sees plaintext; it only moves the four-field JSON
/// document around.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    op: Operator,
    prefix: String,
}

impl CredentialStore {
    pub fn new(op: Operator, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_matches('/').to_string();
        Self { op, prefix }
    }

    fn record_path(&self, user_id: &str) -> VaultResult<String> {
        validate_user_id(user_id)?;
        Ok(format!("{}/{user_id}.json", self.prefix))
    }

    /// Write (or overwrite) the user's record.
    pub async fn put(&self, user_id: &str, bundle: &EncryptionResult) -> VaultResult<()> {
        let path = self.record_path(user_id)?;
        let body = bundle.to_json()?;
        self.op.write(&path, body.into_bytes()).await?;
        tracing::debug!(user_id, path = %path, "wrote credential record");
        Ok(())
    }

    /// Fetch the user's record, or `None` if there is none.
    pub async fn get(&self, user_id: &str) -> VaultResult<Option<EncryptionResult>> {
        let path = self.record_path(user_id)?;
        let buf = match self.op.read(&path).await {
            Ok(buf) => buf,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let text = String::from_utf8(buf.to_vec()).map_err(|e| CryptoError::InvalidInput {
            field: "bundle",
            reason: format!("stored record is not UTF-8: {e}"),
        })?;
        Ok(Some(EncryptionResult::from_json(&text)?))
    }

    /// Delete the user's record. Deleting a missing record is not an error.
    pub async fn delete(&self, user_id: &str) -> VaultResult<()> {
        let path = self.record_path(user_id)?;
        self.op.delete(&path).await?;
        tracing::debug!(user_id, path = %path, "deleted credential record");
        Ok(())
    }

    pub async fn exists(&self, user_id: &str) -> VaultResult<bool> {
        let path = self.record_path(user_id)?;
        match self.op.stat(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// User ids that currently have a record, sorted.
    pub async fn list_users(&self) -> VaultResult<Vec<String>> {
        let dir = format!("{}/", self.prefix);
        let entries = match self.op.list(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut users: Vec<String> = entries
            .iter()
            .filter_map(|entry| entry.name().strip_suffix(".json"))
            .filter(|id| validate_user_id(id).is_ok())
            .map(str::to_string)
            .collect();
        users.sort();
        Ok(users)
    }
}

/// User ids become object keys, so they are restricted to a path-safe set.
pub fn validate_user_id(user_id: &str) -> VaultResult<()> {
    let ok = !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id != "."
        && user_id != ".."
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-'));

    if ok {
        Ok(())
    } else {
        Err(VaultError::InvalidUserId(user_id.to_string()))
    }
}
