//! Credential source abstraction.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`CredentialSource`] - Read-only key/value lookup the vault resolves against
//! - [`EnvSource`] - Process environment implementation
//! - [`MemorySource`] - In-memory implementation, loadable from a dotenv-style file
//!
//! # Key Convention
//!
//! Each logical credential `K` may appear under two keys:
//! - `K_ENCRYPTED` - preferred, a colon-joined hex triple produced by [`crate::cipher::encrypt`]
//! - `K` - legacy plaintext, or a self-describing encrypted value
//!
//! # Example
//!
//! ```
//! use sealbox_core::source::{CredentialSource, MemorySource};
//!
//! let source = MemorySource::new();
//! source.insert("GROQ_API_KEY", "gsk-plain");
//!
//! assert_eq!(source.get("GROQ_API_KEY").as_deref(), Some("gsk-plain"));
//! assert!(source.get("OPENAI_API_KEY").is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod env;
mod memory;

pub use env::EnvSource;
pub use memory::{parse_env_line, MemorySource};

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value.
/// The buffer is wiped when the secret is dropped.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Length of the secret in characters.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Consume the secret and return the inner value.
    pub fn into_inner(mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Error type for credential source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading an env file failed.
    #[error("failed to read env file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A non-comment line in an env file is not `KEY=VALUE`.
    #[error("malformed line {line} in env file {path}")]
    Malformed { path: String, line: usize },
}

/// Read-only lookup of raw credential values.
///
/// Values are returned exactly as stored; decryption happens in the vault.
pub trait CredentialSource: Send + Sync {
    /// Look up a raw value by key.
    ///
    /// Returns `None` if the key is absent or set to an empty string.
    fn get(&self, key: &str) -> Option<String>;

    /// Check if a key is present without returning the value.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<T: CredentialSource + ?Sized> CredentialSource for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<T: CredentialSource + ?Sized> CredentialSource for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_secret_display_redacted() {
        let secret = Secret::new("super-secret");
        let display = format!("{}", secret);
        assert!(!display.contains("super-secret"));
        assert!(display.contains("REDACTED"));
    }

    #[test]
    fn test_secret_into_inner() {
        let secret = Secret::new("sk-abc");
        assert_eq!(secret.char_len(), 6);
        assert_eq!(secret.into_inner(), "sk-abc");
    }

    #[test]
    fn test_boxed_source_delegates() {
        let memory = MemorySource::new();
        memory.insert("COHERE_API_KEY", "co-123");

        let boxed: Box<dyn CredentialSource> = Box::new(memory);
        assert_eq!(boxed.get("COHERE_API_KEY").as_deref(), Some("co-123"));
        assert!(boxed.contains("COHERE_API_KEY"));
        assert!(!boxed.contains("GROQ_API_KEY"));
    }
}
