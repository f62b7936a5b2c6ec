//! Domain model types for Sealbox.
//!
//! This module defines:
//! - [`CredentialName`] - Symbolic name of a provider credential (e.g. `OPENAI_API_KEY`)
//! - [`KNOWN_CREDENTIALS`] - The closed set of provider credentials the status report covers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to a credential name to find its encrypted entry.
pub const ENCRYPTED_SUFFIX: &str = "_ENCRYPTED";

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const GOOGLE_AI_API_KEY: &str = "GOOGLE_AI_API_KEY";
pub const HUGGINGFACE_API_KEY: &str = "HUGGINGFACE_API_KEY";
pub const COHERE_API_KEY: &str = "COHERE_API_KEY";
pub const GROQ_API_KEY: &str = "GROQ_API_KEY";

/// Provider credentials known to the status report, in report order.
pub const KNOWN_CREDENTIALS: [&str; 5] = [
    OPENAI_API_KEY,
    GOOGLE_AI_API_KEY,
    HUGGINGFACE_API_KEY,
    COHERE_API_KEY,
    GROQ_API_KEY,
];

/// Symbolic name of a credential, exactly as it appears in the environment.
///
/// # Examples
///
/// ```
/// use sealbox_core::CredentialName;
///
/// let name = CredentialName::new("OPENAI_API_KEY");
/// assert_eq!(name.encrypted_key(), "OPENAI_API_KEY_ENCRYPTED");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialName(String);

impl CredentialName {
    /// Create a new credential name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the preferred encrypted entry (`{name}_ENCRYPTED`).
    pub fn encrypted_key(&self) -> String {
        format!("{}{}", self.0, ENCRYPTED_SUFFIX)
    }

    /// All known provider credentials, in report order.
    pub fn known() -> Vec<CredentialName> {
        KNOWN_CREDENTIALS.iter().map(|n| Self::new(*n)).collect()
    }

    /// Whether this name is one of [`KNOWN_CREDENTIALS`].
    pub fn is_known(&self) -> bool {
        KNOWN_CREDENTIALS.contains(&self.0.as_str())
    }
}

impl fmt::Display for CredentialName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CredentialName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CredentialName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for CredentialName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
