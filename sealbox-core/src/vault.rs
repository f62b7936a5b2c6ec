//! Credential vault: resolves credential names to plaintext secrets.
//!
//! The vault sits on top of a [`CredentialSource`] and a master password. For a
//! name `K` it prefers `K_ENCRYPTED`, falls back to `K` (plaintext or a legacy
//! encrypted value), and caches whatever it resolves for the life of the
//! vault or until [`CredentialVault::clear_cache`].
//!
//! # Example
//!
//! ```
//! use sealbox_core::{cipher, CredentialName, CredentialVault, MemorySource, VaultConfig};
//!
//! let source = MemorySource::new();
//! let record = cipher::encrypt("sk-live-123", "master").unwrap();
//! source.insert("OPENAI_API_KEY_ENCRYPTED", record);
//!
//! let vault = CredentialVault::new(source, VaultConfig::default().with_master_password("master")).unwrap();
//! let key = vault.get(&CredentialName::new("OPENAI_API_KEY")).unwrap();
//! assert_eq!(key.expose(), "sk-live-123");
//! ```

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cipher::{self, CipherError};
use crate::config::{
    MasterPasswordFallback, VaultConfig, MASTER_PASSWORD_VAR, RECOMMENDED_PASSWORD_LEN,
};
use crate::model::CredentialName;
use crate::source::{CredentialSource, EnvSource, Secret};

/// Display text for an absent credential.
pub const NOT_SET: &str = "Not set";

/// Error type for vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A stored value looked encrypted but could not be decrypted.
    #[error(
        "failed to decrypt {name}: {source}; check that {var} matches the password used to encrypt it",
        var = MASTER_PASSWORD_VAR
    )]
    Decryption {
        name: String,
        #[source]
        source: CipherError,
    },

    /// Encrypting a new value failed.
    #[error("failed to encrypt value for {name}: {source}")]
    Encryption {
        name: String,
        #[source]
        source: CipherError,
    },

    /// No master password is configured and the fallback policy is `Deny`.
    #[error("no master password configured; set {var}")]
    MissingMasterPassword { var: &'static str },
}

impl VaultError {
    fn from_decrypt(name: &CredentialName, err: CipherError) -> Self {
        Self::Decryption {
            name: name.to_string(),
            source: err,
        }
    }
}

/// Where the vault's master password came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordOrigin {
    /// Read from configuration.
    Configured,
    /// Generated for this process because none was configured.
    Ephemeral,
}

impl fmt::Display for PasswordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured => write!(f, "configured"),
            Self::Ephemeral => write!(f, "ephemeral"),
        }
    }
}

/// Protection status of one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStatus {
    /// An `_ENCRYPTED` entry exists and has the encrypted record shape.
    pub encrypted: bool,

    /// Masked value, or [`NOT_SET`].
    pub masked: String,
}

/// Resolves and caches decrypted credentials.
///
/// One vault is meant to be shared per process (wrap it in an `Arc`).
///
/// # Thread Safety
///
/// The cache is guarded by a `RwLock` that is never held while decrypting.
/// Two callers missing the cache for the same name at the same time may both
/// decrypt it; the results are identical.
pub struct CredentialVault<S: CredentialSource = EnvSource> {
    source: S,
    master_password: Secret,
    origin: PasswordOrigin,
    cache: RwLock<HashMap<CredentialName, Secret>>,
}

impl<S: CredentialSource> CredentialVault<S> {
    /// Create a vault over `source` with an explicit configuration.
    pub fn new(source: S, config: VaultConfig) -> Result<Self, VaultError> {
        let (master_password, origin) = match config.master_password {
            Some(password) => (password, PasswordOrigin::Configured),
            None => match config.fallback {
                MasterPasswordFallback::Ephemeral => {
                    warn!(
                        "{} is not set; using a random per-process master password. \
                         Previously encrypted credentials cannot be decrypted until it is configured",
                        MASTER_PASSWORD_VAR
                    );
                    (
                        Secret::new(cipher::generate_master_password()),
                        PasswordOrigin::Ephemeral,
                    )
                }
                MasterPasswordFallback::Deny => {
                    return Err(VaultError::MissingMasterPassword {
                        var: MASTER_PASSWORD_VAR,
                    });
                }
            },
        };

        info!("Using {} encryption master password", origin);

        if master_password.char_len() < RECOMMENDED_PASSWORD_LEN {
            warn!(
                "Encryption master password is shorter than {} characters and may be invalid",
                RECOMMENDED_PASSWORD_LEN
            );
        }

        Ok(Self {
            source,
            master_password,
            origin,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Create a vault reading its configuration from `source` itself.
    pub fn from_source(source: S) -> Result<Self, VaultError> {
        let config = VaultConfig::from_source(&source);
        Self::new(source, config)
    }

    /// The underlying credential source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Where the master password came from.
    pub fn password_origin(&self) -> PasswordOrigin {
        self.origin
    }

    /// Resolve a credential to its plaintext.
    ///
    /// Returns `Ok(None)` when neither `{name}_ENCRYPTED` nor `{name}` is set.
    /// A value that looks encrypted but fails to decrypt is an error; it
    /// never falls through to another entry.
    pub fn resolve(&self, name: &CredentialName) -> Result<Option<Secret>, VaultError> {
        if let Some(cached) = self.cached(name) {
            return Ok(Some(cached));
        }

        if let Some(record) = self.source.get(&name.encrypted_key()) {
            if cipher::is_encrypted(&record) {
                let plaintext = cipher::decrypt(&record, self.master_password.expose())
                    .map_err(|e| VaultError::from_decrypt(name, e))?;
                return Ok(Some(self.remember(name, Secret::new(plaintext))));
            }
            debug!(
                "{} is set but not in encrypted form; ignoring it",
                name.encrypted_key()
            );
        }

        let Some(value) = self.source.get(name.as_str()) else {
            return Ok(None);
        };

        let secret = if cipher::is_encrypted(&value) {
            let plaintext = cipher::decrypt(&value, self.master_password.expose())
                .map_err(|e| VaultError::from_decrypt(name, e))?;
            Secret::new(plaintext)
        } else {
            debug!("{} resolved from plaintext entry", name);
            Secret::new(value)
        };

        Ok(Some(self.remember(name, secret)))
    }

    /// Resolve a credential, logging and swallowing errors.
    pub fn get(&self, name: &CredentialName) -> Option<Secret> {
        match self.resolve(name) {
            Ok(value) => value,
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    }

    /// Masked display form of a credential, or [`NOT_SET`].
    pub fn get_masked(&self, name: &CredentialName) -> String {
        match self.get(name) {
            Some(secret) => cipher::mask_default(secret.expose()),
            None => NOT_SET.to_string(),
        }
    }

    /// Encrypt `plaintext` under the master password and cache it as `name`.
    ///
    /// Returns the encrypted record; persisting it is the caller's job.
    pub fn set(&self, name: &CredentialName, plaintext: &str) -> Result<String, VaultError> {
        let record = cipher::encrypt(plaintext, self.master_password.expose()).map_err(|e| {
            VaultError::Encryption {
                name: name.to_string(),
                source: e,
            }
        })?;
        self.remember(name, Secret::new(plaintext));
        Ok(record)
    }

    /// Drop every cached plaintext. The source is untouched.
    pub fn clear_cache(&self) {
        let mut cache = self.cache.write();
        let count = cache.len();
        cache.clear();
        debug!("cleared {} cached credentials", count);
    }

    /// Number of cached plaintexts.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Whether `{name}_ENCRYPTED` exists and has the encrypted record shape.
    pub fn has_encrypted_entry(&self, name: &CredentialName) -> bool {
        self.source
            .get(&name.encrypted_key())
            .is_some_and(|v| cipher::is_encrypted(&v))
    }

    /// Protection status of every known provider credential.
    pub fn status(&self) -> BTreeMap<String, CredentialStatus> {
        CredentialName::known()
            .into_iter()
            .map(|name| {
                let status = CredentialStatus {
                    encrypted: self.has_encrypted_entry(&name),
                    masked: self.get_masked(&name),
                };
                (name.to_string(), status)
            })
            .collect()
    }

    fn cached(&self, name: &CredentialName) -> Option<Secret> {
        let cached = self.cache.read().get(name).cloned();
        if cached.is_some() {
            debug!("vault cache hit for {}", name);
        }
        cached
    }

    fn remember(&self, name: &CredentialName, secret: Secret) -> Secret {
        self.cache.write().insert(name.clone(), secret.clone());
        secret
    }
}

impl<S: CredentialSource + 'static> CredentialVault<S> {
    /// [`get`](Self::get) for async callers.
    ///
    /// A cache miss derives the key on tokio's blocking pool.
    pub async fn get_async(self: &Arc<Self>, name: &CredentialName) -> Option<Secret> {
        if let Some(cached) = self.cached(name) {
            return Some(cached);
        }

        let vault = Arc::clone(self);
        let name = name.clone();
        match tokio::task::spawn_blocking(move || vault.get(&name)).await {
            Ok(value) => value,
            Err(e) => {
                error!("credential resolution task failed: {}", e);
                None
            }
        }
    }
}

impl<S: CredentialSource> fmt::Debug for CredentialVault<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault")
            .field("origin", &self.origin)
            .field("cached", &self.cached_len())
            .finish()
    }
}
