//! API request/response types for the daemon JSON-RPC interface.
//!
//! `env_status` and `dispatch` answer with core types directly
//! ([`sealbox_core::StatusReport`], [`sealbox_core::ProviderResult`]).

use serde::{Deserialize, Serialize};

/// Masked display form of one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedResponse {
    /// Credential name as requested
    pub name: String,
    /// Masked value, or "Not set"
    pub masked: String,
}

/// Plain confirmation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
