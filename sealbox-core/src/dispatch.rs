//! Provider failover dispatcher.
//!
//! A [`Dispatcher`] tries its providers strictly in order, once each, and
//! returns the first successful answer. When every provider fails it returns
//! a demo result instead of an error, so callers always get a
//! [`ProviderResult`] to show.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::provider::{Provider, ProviderError, ProviderRegistry, ProviderResult, DEMO_PROVIDER};
use crate::source::{CredentialSource, EnvSource};
use crate::vault::CredentialVault;

/// A request rejected before any provider was tried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("request text must not be empty")]
    EmptyRequest,
}

/// Ordered provider failover over a shared vault.
pub struct Dispatcher<S: CredentialSource = EnvSource> {
    vault: Arc<CredentialVault<S>>,
    providers: Vec<Arc<dyn Provider>>,
}

impl<S: CredentialSource + 'static> Dispatcher<S> {
    /// Create a dispatcher over an explicit, already ordered provider list.
    pub fn new(vault: Arc<CredentialVault<S>>, providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { vault, providers }
    }

    /// Create a dispatcher ordering `registry`'s providers by `config.priority`.
    ///
    /// Identifiers missing from the registry are skipped with a warning.
    pub fn from_registry(
        vault: Arc<CredentialVault<S>>,
        registry: &ProviderRegistry,
        config: &DispatchConfig,
    ) -> Self {
        let providers = config
            .priority
            .iter()
            .filter_map(|id| {
                let provider = registry.get(id);
                if provider.is_none() {
                    warn!("Unknown provider '{}' in priority list; skipping", id);
                }
                provider
            })
            .collect();

        Self::new(vault, providers)
    }

    /// Identifiers of the providers in try order.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// The vault supplying provider credentials.
    pub fn vault(&self) -> &Arc<CredentialVault<S>> {
        &self.vault
    }

    /// Send `request` to the first provider that answers.
    ///
    /// `kind` labels the request and only shapes the demo fallback text.
    pub async fn dispatch(&self, request: &str, kind: &str) -> ProviderResult {
        if let Err(e) = validate_request(request) {
            return ProviderResult::failure(e.to_string());
        }

        for provider in &self.providers {
            debug!("Trying provider {}", provider.id());

            match self.attempt(provider.as_ref(), request).await {
                Ok(text) => {
                    info!("Provider {} answered {} request", provider.id(), kind);
                    return ProviderResult::success(provider.id(), text);
                }
                Err(e) => {
                    warn!("{} failed, trying next provider: {}", provider.id(), e);
                }
            }
        }

        warn!(
            "All {} providers failed; returning demo {} response",
            self.providers.len(),
            kind
        );
        demo_response(kind)
    }

    async fn attempt(&self, provider: &dyn Provider, request: &str) -> Result<String, ProviderError> {
        let credential = provider.credential();
        let api_key = self
            .vault
            .get_async(credential)
            .await
            .ok_or_else(|| ProviderError::MissingCredential(credential.to_string()))?;

        provider.call(request, &api_key).await
    }
}

impl<S: CredentialSource + 'static> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("providers", &self.provider_ids())
            .finish()
    }
}

/// Reject empty or whitespace-only requests.
pub fn validate_request(request: &str) -> Result<(), DispatchError> {
    if request.trim().is_empty() {
        return Err(DispatchError::EmptyRequest);
    }
    Ok(())
}

/// The result returned when every provider has failed.
pub fn demo_response(kind: &str) -> ProviderResult {
    let data = format!(
        "# {kind_upper} Analysis\n\
         \n\
         ## Demo Mode\n\
         *All AI providers are currently unavailable. Showing sample analysis format.*\n\
         \n\
         ## Analysis Overview\n\
         This is a demonstration of the analysis format. To get real analysis, configure at \
         least one of the following API keys:\n\
         \n\
         - HUGGINGFACE_API_KEY: https://huggingface.co/\n\
         - COHERE_API_KEY: https://cohere.ai/\n\
         - GOOGLE_AI_API_KEY: https://makersuite.google.com/\n\
         - GROQ_API_KEY: https://groq.com/\n\
         - OPENAI_API_KEY: https://platform.openai.com/\n\
         \n\
         ## Sample Analysis Content\n\
         [This would contain detailed analysis specific to {kind}]\n",
        kind_upper = kind.to_uppercase(),
        kind = kind,
    );

    ProviderResult::success(DEMO_PROVIDER, data)
}
