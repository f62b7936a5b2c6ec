//! Library configuration read from the credential source.
//!
//! Two settings are read once, at construction:
//! - `ENCRYPTION_MASTER_PASSWORD` - the vault's master password
//! - `API_PRIORITY` - comma-separated provider order for the dispatcher

use serde::{Deserialize, Serialize};

use crate::source::{CredentialSource, Secret};

/// Variable holding the master password.
pub const MASTER_PASSWORD_VAR: &str = "ENCRYPTION_MASTER_PASSWORD";

/// Variable holding the provider priority list.
pub const PROVIDER_PRIORITY_VAR: &str = "API_PRIORITY";

/// Provider order used when `API_PRIORITY` is unset.
pub const DEFAULT_PROVIDER_PRIORITY: &str = "openai,huggingface,cohere,google,groq";

/// Master passwords shorter than this trigger a warning.
pub const RECOMMENDED_PASSWORD_LEN: usize = 64;

/// What the vault does when no master password is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterPasswordFallback {
    /// Generate a random password for this process. Values encrypted under
    /// any other password stay unreadable until the real one is configured.
    #[default]
    Ephemeral,

    /// Refuse to construct the vault.
    Deny,
}

/// Configuration for [`crate::vault::CredentialVault`].
#[derive(Debug, Clone, Default)]
pub struct VaultConfig {
    /// Configured master password, if any.
    pub master_password: Option<Secret>,

    /// Policy applied when `master_password` is `None`.
    pub fallback: MasterPasswordFallback,
}

impl VaultConfig {
    /// Read the master password from `source`.
    pub fn from_source(source: &impl CredentialSource) -> Self {
        Self {
            master_password: source.get(MASTER_PASSWORD_VAR).map(Secret::new),
            fallback: MasterPasswordFallback::default(),
        }
    }

    /// Set the master password explicitly.
    pub fn with_master_password(mut self, password: impl Into<String>) -> Self {
        self.master_password = Some(Secret::new(password));
        self
    }

    /// Set the missing-password policy.
    pub fn with_fallback(mut self, fallback: MasterPasswordFallback) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Configuration for [`crate::dispatch::Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Provider identifiers in the order they are tried.
    pub priority: Vec<String>,
}

impl DispatchConfig {
    /// Build from an explicit priority list string.
    pub fn from_priority(list: &str) -> Self {
        Self {
            priority: parse_priority(list),
        }
    }

    /// Read `API_PRIORITY` from `source`, falling back to the default order.
    pub fn from_source(source: &impl CredentialSource) -> Self {
        match source.get(PROVIDER_PRIORITY_VAR) {
            Some(list) => Self::from_priority(&list),
            None => Self::default(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::from_priority(DEFAULT_PROVIDER_PRIORITY)
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_priority(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
