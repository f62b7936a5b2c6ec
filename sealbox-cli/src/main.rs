//! Sealbox CLI
//!
//! Command-line interface for encrypting provider credentials and checking
//! their security status.
//!
//! # Usage
//!
//! ```bash
//! # Encrypt the plaintext API keys in .env.local
//! sealbox encrypt-env
//!
//! # Show which keys are encrypted
//! sealbox status
//!
//! # Run a request through the provider failover chain
//! sealbox dispatch fundamental "Analyze AAPL"
//! ```

mod client;
mod report;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use sealbox_core::config::MASTER_PASSWORD_VAR;
use sealbox_core::migrate::{self, LineOutcome, MigrationLayout};
use sealbox_core::{
    cipher, CredentialName, CredentialSource, CredentialVault, DispatchConfig, Dispatcher,
    EnvSource, MemorySource, ProviderRegistry, ProviderResult, StatusReport, VaultConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use client::{DaemonClient, default_socket_path};

#[derive(Parser)]
#[command(name = "sealbox")]
#[command(about = "Encrypted API credentials and provider failover")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Daemon socket path
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the security status of every known API key
    Status {
        /// Read credentials from this env file instead of the daemon
        #[arg(short, long)]
        env_file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Encrypt the plaintext API keys of an env file in place
    EncryptEnv {
        /// Env file to rewrite
        #[arg(short, long, default_value = ".env.local")]
        file: PathBuf,

        /// Overwrite values under their original names instead of NAME_ENCRYPTED
        #[arg(long)]
        legacy: bool,
    },

    /// Print a new random master password
    GeneratePassword,

    /// Encrypt one value and print it as an env line
    Encrypt {
        /// Credential name (e.g., OPENAI_API_KEY)
        name: String,

        /// Plaintext value
        value: String,
    },

    /// Decrypt one encrypted record
    Decrypt {
        /// Record in salt:iv:ciphertext form
        record: String,

        /// Print the plaintext instead of its masked form
        #[arg(long)]
        reveal: bool,
    },

    /// Send a request through the provider failover chain
    Dispatch {
        /// Request kind (e.g., fundamental, technical, news)
        kind: String,

        /// Request text
        text: String,

        /// Read credentials from this env file instead of the daemon
        #[arg(short, long)]
        env_file: Option<PathBuf>,
    },

    /// Drop the daemon's cached credentials
    ClearCache,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let socket = cli.socket.unwrap_or_else(default_socket_path);

    match cli.command {
        Commands::Status { env_file, format } => status(&socket, env_file.as_deref(), format).await,
        Commands::EncryptEnv { file, legacy } => encrypt_env(&file, legacy).await,
        Commands::GeneratePassword => {
            println!("{}", cipher::generate_master_password());
            Ok(())
        }
        Commands::Encrypt { name, value } => encrypt_value(&name, &value),
        Commands::Decrypt { record, reveal } => decrypt_value(&record, reveal),
        Commands::Dispatch { kind, text, env_file } => {
            dispatch(&socket, &kind, &text, env_file.as_deref()).await
        }
        Commands::ClearCache => clear_cache(&socket).await,
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Master password from the process environment.
fn env_master_password() -> Option<String> {
    EnvSource::new().get(MASTER_PASSWORD_VAR)
}

/// Credential source for local operation: an env file or the process environment.
///
/// An env file without a master password borrows the one from the environment.
async fn local_source(env_file: Option<&Path>) -> Result<Arc<dyn CredentialSource>> {
    match env_file {
        Some(path) => {
            let source = MemorySource::load_env_file(path)
                .await
                .with_context(|| format!("Failed to read env file {:?}", path))?;

            if source.get(MASTER_PASSWORD_VAR).is_none() {
                if let Some(password) = env_master_password() {
                    debug!("Using master password from the environment");
                    source.insert(MASTER_PASSWORD_VAR, password);
                }
            }

            Ok(Arc::new(source))
        }
        None => Ok(Arc::new(EnvSource::new())),
    }
}

async fn status(socket: &Path, env_file: Option<&Path>, format: OutputFormat) -> Result<()> {
    let report = match env_file {
        Some(_) => local_report(env_file).await?,
        None => {
            let mut client = DaemonClient::connect(socket).await;
            if client.is_connected() {
                client.env_status().await?
            } else {
                debug!("Daemon not running, building report locally");
                local_report(None).await?
            }
        }
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", report::render_text(&report)),
    }

    Ok(())
}

async fn local_report(env_file: Option<&Path>) -> Result<StatusReport> {
    let source = local_source(env_file).await?;
    let vault = CredentialVault::from_source(source)?;
    Ok(StatusReport::from_vault(&vault))
}

async fn encrypt_env(file: &Path, legacy: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?;

    let from_file = MemorySource::from_env_str(&content, &file.display().to_string())?
        .get(MASTER_PASSWORD_VAR);

    let (password, generated) = match env_master_password().or(from_file) {
        Some(password) => (password, false),
        None => (cipher::generate_master_password(), true),
    };

    let layout = if legacy {
        MigrationLayout::Legacy
    } else {
        MigrationLayout::Suffixed
    };

    let migration = migrate::encrypt_env_content(&content, &password, layout)?;

    for outcome in &migration.outcomes {
        match outcome {
            LineOutcome::Encrypted { key, masked } => println!("Encrypted {}: {}", key, masked),
            LineOutcome::AlreadyEncrypted { key } => println!("{} is already encrypted", key),
            LineOutcome::Conflict { key } => println!(
                "Skipped {}: {}_ENCRYPTED already exists, remove the plaintext line by hand",
                key, key
            ),
        }
    }

    if !migration.has_changes() {
        println!("No plaintext API keys to encrypt in {}", file.display());
        return Ok(());
    }

    let backup = backup_path(file);
    tokio::fs::copy(file, &backup)
        .await
        .with_context(|| format!("Failed to write backup {:?}", backup))?;
    info!("Backup written to {:?}", backup);

    tokio::fs::write(file, &migration.content)
        .await
        .with_context(|| format!("Failed to write {:?}", file))?;

    println!();
    println!(
        "Encrypted {} keys in {} (backup: {})",
        migration.encrypted_count(),
        file.display(),
        backup.display()
    );

    if generated {
        println!();
        println!("Generated master password. Store it as {}:", MASTER_PASSWORD_VAR);
        println!("{}={}", MASTER_PASSWORD_VAR, password);
    }

    Ok(())
}

fn backup_path(file: &Path) -> PathBuf {
    let stamp = chrono::Utc::now().timestamp_millis();
    let mut name = file.as_os_str().to_os_string();
    name.push(format!(".backup.{}", stamp));
    PathBuf::from(name)
}

fn required_master_password() -> Result<String> {
    match env_master_password() {
        Some(password) => Ok(password),
        None => bail!("{} is not set", MASTER_PASSWORD_VAR),
    }
}

fn encrypt_value(name: &str, value: &str) -> Result<()> {
    let password = required_master_password()?;
    let record = cipher::encrypt(value, &password)?;
    println!("{}={}", CredentialName::new(name).encrypted_key(), record);
    Ok(())
}

fn decrypt_value(record: &str, reveal: bool) -> Result<()> {
    let password = required_master_password()?;
    let plaintext = cipher::decrypt(record.trim(), &password)
        .context("Failed to decrypt record; check the master password")?;

    if reveal {
        println!("{}", plaintext);
    } else {
        println!("{}", cipher::mask_default(&plaintext));
    }
    Ok(())
}

async fn dispatch(socket: &Path, kind: &str, text: &str, env_file: Option<&Path>) -> Result<()> {
    let result = if env_file.is_none() {
        let mut client = DaemonClient::connect(socket).await;
        if client.is_connected() {
            client.dispatch(text, kind).await?
        } else {
            local_dispatch(None, kind, text).await?
        }
    } else {
        local_dispatch(env_file, kind, text).await?
    };

    print_result(&result)
}

async fn local_dispatch(env_file: Option<&Path>, kind: &str, text: &str) -> Result<ProviderResult> {
    let source = local_source(env_file).await?;
    let config = DispatchConfig::from_source(&source);
    let vault = Arc::new(CredentialVault::from_source(source)?);
    let dispatcher = Dispatcher::from_registry(vault, &ProviderRegistry::default(), &config);

    debug!("Local dispatch over {:?}", dispatcher.provider_ids());
    Ok(dispatcher.dispatch(text, kind).await)
}

fn print_result(result: &ProviderResult) -> Result<()> {
    if !result.success {
        bail!(
            "{}",
            result.error.as_deref().unwrap_or("request failed")
        );
    }

    if let Some(provider) = &result.provider {
        eprintln!("[{}]", provider);
    }
    println!("{}", result.data.as_deref().unwrap_or_default());
    Ok(())
}

async fn clear_cache(socket: &Path) -> Result<()> {
    let mut client = DaemonClient::connect(socket).await;
    if !client.is_connected() {
        bail!("Daemon is not running at {:?}", socket);
    }

    let response = client.clear_cache().await?;
    println!("{}", response.message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path() {
        let backup = backup_path(Path::new("/tmp/app/.env.local"));
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        let stamp = name.strip_prefix(".env.local.backup.").unwrap();
        assert!(stamp.parse::<i64>().is_ok());
        assert_eq!(backup.parent(), Some(Path::new("/tmp/app")));
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::parse_from(["sealbox", "status", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Commands::Status { env_file: None, format: OutputFormat::Json }
        ));

        let cli = Cli::parse_from(["sealbox", "encrypt-env", "--legacy"]);
        match cli.command {
            Commands::EncryptEnv { file, legacy } => {
                assert_eq!(file, PathBuf::from(".env.local"));
                assert!(legacy);
            }
            _ => panic!("Expected EncryptEnv"),
        }

        let cli = Cli::parse_from(["sealbox", "--socket", "/tmp/s.sock", "clear-cache"]);
        assert_eq!(cli.socket, Some(PathBuf::from("/tmp/s.sock")));
    }
}
