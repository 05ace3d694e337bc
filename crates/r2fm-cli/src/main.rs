//! r2fm: seal, open and manage per-user storage credentials
//!
//! Commands:
//!   encrypt                 - seal credentials, print the four-field bundle
//!   decrypt <bundle.json>   - open a bundle, print the credentials
//!   save --user <id>        - seal credentials into the configured store
//!   load --user <id>        - open a user's stored credentials
//!   remove --user <id>      - delete a user's stored credentials
//!   list                    - list users with stored credentials
//!   config show             - display the effective configuration
//!
//! The passphrase is read from R2FM_PASSPHRASE or prompted for.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};

use r2fm_core::R2fmConfig;
use r2fm_crypto::{CredentialBundle, EncryptionResult, EnvelopeCodec};
use r2fm_secrets::CredentialVault;

const PASSPHRASE_ENV: &str = "R2FM_PASSPHRASE";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "r2fm",
    version,
    about = "Manage encrypted object-storage credentials",
    long_about = "r2fm: seal R2/S3 credentials under a passphrase and store them per user"
)]
struct Cli {
    /// Path to r2fm.toml configuration file
    #[arg(long, short = 'c', env = "R2FM_CONFIG", default_value = "/etc/r2fm/config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "R2FM_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "R2FM_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seal credentials and print the encrypted bundle as JSON
    Encrypt {
        #[command(flatten)]
        creds: CredentialArgs,
        /// Write the bundle to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Open an encrypted bundle and print the credentials as JSON
    Decrypt {
        /// Bundle file produced by `r2fm encrypt`
        bundle: PathBuf,
    },

    /// Seal credentials and store them for a user (replaces any existing record)
    Save {
        #[arg(long, short = 'u')]
        user: String,
        #[command(flatten)]
        creds: CredentialArgs,
    },

    /// Load and open a user's stored credentials
    Load {
        #[arg(long, short = 'u')]
        user: String,
    },

    /// Delete a user's stored credentials
    Remove {
        #[arg(long, short = 'u')]
        user: String,
    },

    /// List users that have stored credentials
    List,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Args)]
struct CredentialArgs {
    /// Cloudflare account identifier
    #[arg(long, env = "R2_ACCOUNT_ID")]
    account_id: String,
    /// API token
    #[arg(long, env = "R2_API_TOKEN", hide_env_values = true)]
    api_token: String,
    /// R2 access key id
    #[arg(long, env = "R2_ACCESS_KEY", hide_env_values = true)]
    access_key: String,
    /// R2 secret access key
    #[arg(long, env = "R2_SECRET_KEY", hide_env_values = true)]
    secret_key: String,
}

impl std::fmt::Debug for CredentialArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialArgs")
            .field("account_id", &self.account_id)
            .field("api_token", &"[REDACTED]")
            .field("access_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl From<CredentialArgs> for CredentialBundle {
    fn from(args: CredentialArgs) -> Self {
        CredentialBundle::new(
            args.account_id,
            args.api_token,
            args.access_key,
            args.secret_key,
        )
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = R2fmConfig::load(&cli.config);
    let defaults = R2fmConfig::default();
    let log_cfg = match &loaded {
        Ok(config) => &config.log,
        Err(_) => &defaults.log,
    };
    let level = cli.log.clone().unwrap_or_else(|| log_cfg.level.clone());
    let format = cli.log_format.clone().unwrap_or(match log_cfg.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    let config = loaded.with_context(|| format!("loading config {}", cli.config.display()))?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        backend = %config.store.backend,
        "r2fm starting"
    );

    match cli.command {
        Commands::Encrypt { creds, output } => cmd_encrypt(&config, creds.into(), output.as_deref()),
        Commands::Decrypt { bundle } => cmd_decrypt(&config, &bundle),
        Commands::Save { user, creds } => cmd_save(&config, &user, creds.into()).await,
        Commands::Load { user } => cmd_load(&config, &user).await,
        Commands::Remove { user } => cmd_remove(&config, &user).await,
        Commands::List => cmd_list(&config).await,
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn codec_for(config: &R2fmConfig) -> EnvelopeCodec {
    EnvelopeCodec::default().with_iterations(config.crypto.pbkdf2_iterations)
}

/// Passphrase from the environment, or an interactive prompt.
fn read_passphrase(confirm: bool) -> Result<SecretString> {
    if let Ok(value) = std::env::var(PASSPHRASE_ENV) {
        return Ok(SecretString::from(value));
    }

    let first = SecretString::from(
        rpassword::prompt_password("Passphrase: ").context("reading passphrase")?,
    );
    if confirm {
        let second = SecretString::from(
            rpassword::prompt_password("Confirm passphrase: ")
                .context("reading passphrase confirmation")?,
        );
        if first.expose_secret() != second.expose_secret() {
            anyhow::bail!("passphrases do not match");
        }
    }
    Ok(first)
}

fn print_credentials(creds: &CredentialBundle) -> Result<()> {
    let rendered = serde_json::to_string_pretty(creds).context("serializing credentials")?;
    println!("{rendered}");
    Ok(())
}

// ── `r2fm encrypt` / `r2fm decrypt` ───────────────────────────────────────────

fn cmd_encrypt(config: &R2fmConfig, creds: CredentialBundle, output: Option<&Path>) -> Result<()> {
    let passphrase = read_passphrase(true)?;
    if passphrase.expose_secret().chars().count() < config.crypto.min_passphrase_len {
        anyhow::bail!(
            "passphrase must be at least {} characters",
            config.crypto.min_passphrase_len
        );
    }

    let bundle = codec_for(config)
        .encrypt_credentials(&creds, &passphrase)
        .context("sealing credentials")?;
    let json = serde_json::to_string_pretty(&bundle).context("serializing bundle")?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("wrote sealed bundle to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_decrypt(config: &R2fmConfig, bundle_path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(bundle_path)
        .with_context(|| format!("reading {}", bundle_path.display()))?;
    let bundle = EncryptionResult::from_json(&text)
        .with_context(|| format!("parsing bundle {}", bundle_path.display()))?;

    let passphrase = read_passphrase(false)?;
    let creds = codec_for(config)
        .decrypt_credentials(&bundle, &passphrase)
        .context("opening bundle")?;
    print_credentials(&creds)
}

// ── Store-backed commands ─────────────────────────────────────────────────────

fn vault_for(config: &R2fmConfig) -> Result<CredentialVault> {
    CredentialVault::from_config(config).context("opening credential store")
}

async fn cmd_save(config: &R2fmConfig, user: &str, creds: CredentialBundle) -> Result<()> {
    let vault = vault_for(config)?;
    let passphrase = read_passphrase(true)?;
    vault
        .save(user, &creds, &passphrase)
        .await
        .with_context(|| format!("saving credentials for {user}"))?;
    eprintln!("saved credentials for {user}");
    Ok(())
}

async fn cmd_load(config: &R2fmConfig, user: &str) -> Result<()> {
    let vault = vault_for(config)?;
    let passphrase = read_passphrase(false)?;
    let creds = vault
        .load(user, &passphrase)
        .await
        .with_context(|| format!("loading credentials for {user}"))?;
    print_credentials(&creds)
}

async fn cmd_remove(config: &R2fmConfig, user: &str) -> Result<()> {
    let vault = vault_for(config)?;
    vault
        .remove(user)
        .await
        .with_context(|| format!("removing credentials for {user}"))?;
    eprintln!("removed credentials for {user}");
    Ok(())
}

async fn cmd_list(config: &R2fmConfig) -> Result<()> {
    let vault = vault_for(config)?;
    for user in vault.list_users().await.context("listing users")? {
        println!("{user}");
    }
    Ok(())
}

// ── `r2fm config show` ────────────────────────────────────────────────────────

fn cmd_config_show(config: &R2fmConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
