//! Text-generation providers and their registry.
//!
//! This module provides:
//! - [`Provider`] - An external service that turns request text into generated text
//! - [`ProviderResult`] - The caller-facing outcome of a dispatch
//! - [`ProviderError`] - Why a single provider attempt failed
//! - [`ProviderRegistry`] - Registry of providers by identifier
//!
//! The registry comes pre-configured with the HTTP adapters from
//! [`crate::providers`] when the `http-providers` feature is enabled, and can
//! be extended with custom providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::model::CredentialName;
use crate::source::Secret;

/// Provider identifier used for the synthesized demo result.
pub const DEMO_PROVIDER: &str = "demo";

/// Why one provider attempt failed.
///
/// These never reach dispatch callers; the dispatcher logs them and moves on.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider's credential is not configured.
    #[error("credential {0} is not configured")]
    MissingCredential(String),

    /// The provider answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never completed.
    #[error("network error: {0}")]
    Network(String),

    /// The response did not contain generated text.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Create an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}

#[cfg(feature = "http-providers")]
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs may carry a key as a query parameter.
        let err = err.without_url();
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// An external text-generation service.
///
/// Implementations are stateless apart from connection pools and may be
/// shared across tasks.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identifier used in the priority list (e.g. `"openai"`).
    fn id(&self) -> &str;

    /// Credential this provider needs.
    fn credential(&self) -> &CredentialName;

    /// Send `request` and return the generated text.
    async fn call(&self, request: &str, api_key: &Secret) -> Result<String, ProviderError>;
}

/// Outcome of a dispatch.
///
/// `success` is `true` for both a real provider answer and the demo fallback;
/// [`ProviderResult::is_demo`] tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl ProviderResult {
    /// A successful answer from `provider`.
    pub fn success(provider: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
            provider: Some(provider.into()),
        }
    }

    /// A failure with no provider attribution.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            provider: None,
        }
    }

    /// Whether this is the synthesized demo result.
    pub fn is_demo(&self) -> bool {
        self.provider.as_deref() == Some(DEMO_PROVIDER)
    }
}

/// Registry of providers keyed by identifier.
///
/// # Example
///
/// ```
/// use sealbox_core::provider::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// assert!(registry.is_empty());
/// assert!(registry.get("openai").is_none());
/// ```
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Create a registry with the built-in HTTP adapters registered.
    ///
    /// Registered identifiers: `openai`, `huggingface`, `cohere`, `google`, `groq`.
    #[cfg(feature = "http-providers")]
    pub fn with_defaults() -> Self {
        let client = reqwest::Client::new();
        let mut registry = Self::new();

        registry.register(Arc::new(crate::providers::ChatCompletionsProvider::openai(
            client.clone(),
        )));
        registry.register(Arc::new(crate::providers::ChatCompletionsProvider::groq(
            client.clone(),
        )));
        registry.register(Arc::new(crate::providers::HuggingFaceProvider::new(
            client.clone(),
        )));
        registry.register(Arc::new(crate::providers::CohereProvider::new(client.clone())));
        registry.register(Arc::new(crate::providers::GoogleProvider::new(client)));

        registry
    }

    /// Register a provider.
    ///
    /// If a provider with the same ID already exists, it will be replaced.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.id().to_string(), provider);
    }

    /// Get a provider by ID.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(id).cloned()
    }

    /// Check if a provider is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// List all registered provider IDs, sorted.
    pub fn list_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Remove a provider from the registry.
    pub fn remove(&mut self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.remove(id)
    }

    /// Get the number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    #[cfg(feature = "http-providers")]
    fn default() -> Self {
        Self::with_defaults()
    }

    #[cfg(not(feature = "http-providers"))]
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list_ids())
            .finish()
    }
}
