use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{R2fmError, R2fmResult};

/// PBKDF2 round count used when nothing else is configured.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

/// Top-level configuration (loaded from r2fm.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct R2fmConfig {
    pub log: LogConfig,
    pub crypto: CryptoConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Credential envelope parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2-HMAC-SHA256 rounds for KEK derivation (default: 100000)
    pub pbkdf2_iterations: u32,
    /// Shortest passphrase accepted when saving credentials (default: 8)
    pub min_passphrase_len: usize,
}

/// Where encrypted credential records live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend: "fs", "memory" or "s3"
    pub backend: String,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// Key prefix under which per-user records are written
    pub prefix: String,
    /// S3 endpoint (s3 backend only)
    pub endpoint: String,
    /// S3 region (default: auto)
    pub region: String,
    /// S3 bucket name
    pub bucket: String,
    /// Refuse plaintext HTTP S3 endpoints
    pub enforce_tls: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            min_passphrase_len: 8,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "fs".into(),
            root: PathBuf::from("~/.local/share/r2fm"),
            prefix: "user-configs".into(),
            endpoint: String::new(),
            region: "auto".into(),
            bucket: "r2fm".into(),
            enforce_tls: true,
        }
    }
}

impl R2fmConfig {
    /// Read and validate a TOML config file.
    ///
    /// A missing file is not an error: defaults are returned and a warning
    /// is logged.
    pub fn load(path: &Path) -> R2fmResult<Self> {
        if !path.exists() {
            tracing::warn!(
                "config file not found: {}  (using defaults)",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| R2fmError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> R2fmResult<()> {
        if self.crypto.pbkdf2_iterations < DEFAULT_PBKDF2_ITERATIONS {
            return Err(R2fmError::Config(format!(
                "crypto.pbkdf2_iterations = {} is below the minimum of {}",
                self.crypto.pbkdf2_iterations, DEFAULT_PBKDF2_ITERATIONS
            )));
        }
        if self.crypto.min_passphrase_len == 0 {
            return Err(R2fmError::Config(
                "crypto.min_passphrase_len must be at least 1".into(),
            ));
        }
        match self.store.backend.as_str() {
            "fs" | "memory" | "s3" => {}
            other => {
                return Err(R2fmError::Config(format!(
                    "unknown store.backend {other:?} (expected fs, memory or s3)"
                )))
            }
        }
        if self.store.prefix.is_empty() || self.store.prefix.contains("..") {
            return Err(R2fmError::Config(format!(
                "invalid store.prefix {:?}",
                self.store.prefix
            )));
        }
        Ok(())
    }
}
