//! OpenDAL Operator factory for the credential store backends

use opendal::Operator;
use r2fm_core::config::StoreConfig;

use crate::error::{VaultError, VaultResult};

/// Build the operator named by `store.backend`.
///
/// - `memory`: process-local, for tests and dry runs
/// - `fs`: a directory on local disk (`store.root`, `~/` expanded)
/// - `s3`: any S3-compatible endpoint (R2, MinIO, SeaweedFS); credentials
///   come from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
pub fn build_operator(store: &StoreConfig) -> VaultResult<Operator> {
    match store.backend.as_str() {
        "memory" => Ok(Operator::new(opendal::services::Memory::default())?.finish()),
        "fs" => {
            let root = expand_home(&store.root.to_string_lossy());
            let builder = opendal::services::Fs::default().root(&root);
            Ok(Operator::new(builder)?
                .layer(opendal::layers::LoggingLayer::default())
                .finish())
        }
        "s3" => build_s3(store),
        other => Err(VaultError::Config(format!(
            "unknown store backend {other:?} (expected fs, memory or s3)"
        ))),
    }
}

fn build_s3(store: &StoreConfig) -> VaultResult<Operator> {
    if store.endpoint.starts_with("http://") {
        if store.enforce_tls {
            return Err(VaultError::Config(format!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set store.enforce_tls = false for local development.",
                store.endpoint
            )));
        }
        tracing::warn!(
            endpoint = %store.endpoint,
            "S3 endpoint uses plaintext HTTP; sealed credentials travel unencrypted at the transport layer"
        );
    }

    let access_key = std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_default();
    let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default();

    let builder = opendal::services::S3::default()
        .endpoint(&store.endpoint)
        .region(&store.region)
        .bucket(&store.bucket)
        .access_key_id(&access_key)
        .secret_access_key(&secret_key);

    Ok(Operator::new(builder)?
        .layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(5)
                .with_jitter(),
        )
        .finish())
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{home}/{rest}"),
        _ => path.to_string(),
    }
}
