//! # Sealbox Core
//!
//! Credential security and provider failover.
//!
//! This crate provides:
//! - An AES-256-CBC codec for single credential values, keyed by PBKDF2
//! - A credential vault that resolves encrypted or legacy plaintext entries
//! - A security status report over the known provider credentials
//! - An ordered failover dispatcher over text-generation providers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sealbox_core::{CredentialVault, DispatchConfig, Dispatcher, EnvSource, ProviderRegistry};
//!
//! async fn analyze(text: &str) -> Result<String, sealbox_core::SealboxError> {
//!     let vault = Arc::new(CredentialVault::from_source(EnvSource::new())?);
//!     let config = DispatchConfig::from_source(vault.source());
//!     let dispatcher = Dispatcher::from_registry(vault, &ProviderRegistry::with_defaults(), &config);
//!     let result = dispatcher.dispatch(text, "fundamental").await;
//!     Ok(result.data.unwrap_or_default())
//! }
//! ```

pub mod cipher;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod kdf;
pub mod migrate;
pub mod model;
pub mod provider;
pub mod source;
pub mod status;
pub mod vault;

#[cfg(feature = "http-providers")]
pub mod providers;

// Re-export commonly used types at crate root
pub use cipher::{CipherError, EncryptedValue};

pub use config::{DispatchConfig, MasterPasswordFallback, VaultConfig};

pub use dispatch::{DispatchError, Dispatcher};

pub use error::SealboxError;

pub use model::{CredentialName, KNOWN_CREDENTIALS};

pub use provider::{Provider, ProviderError, ProviderRegistry, ProviderResult};

pub use source::{CredentialSource, EnvSource, MemorySource, Secret, SourceError};

pub use status::{SecurityLevel, StatusReport};

pub use vault::{CredentialStatus, CredentialVault, PasswordOrigin, VaultError};
