//! Process environment credential source.

use super::CredentialSource;

/// Reads credentials from the process environment.
///
/// Empty variables are treated as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl EnvSource {
    /// Create a new environment source.
    pub fn new() -> Self {
        Self
    }
}

impl CredentialSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        match std::env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }
}
