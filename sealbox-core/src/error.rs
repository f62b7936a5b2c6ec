//! Top-level error types for Sealbox.

use thiserror::Error;

use crate::cipher::CipherError;
use crate::dispatch::DispatchError;
use crate::source::SourceError;
use crate::vault::VaultError;

/// Top-level error type encompassing all Sealbox errors.
#[derive(Debug, Error)]
pub enum SealboxError {
    /// Error from the cipher codec.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// Error from the credential vault.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// Error loading a credential source.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Request rejected by the dispatcher.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SealboxError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        let err: SealboxError = DispatchError::EmptyRequest.into();
        assert_eq!(err.to_string(), "dispatch error: request text must not be empty");

        let err: SealboxError = crate::cipher::decrypt("a:b", "pw").unwrap_err().into();
        assert!(matches!(err, SealboxError::Cipher(CipherError::Format { .. })));

        assert_eq!(
            SealboxError::config("bad socket path").to_string(),
            "configuration error: bad socket path"
        );
    }
}
