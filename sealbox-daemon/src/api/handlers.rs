//! JSON-RPC API handlers for the daemon.

use anyhow::{Context, Result};
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::{ErrorCode, ErrorObject};
use sealbox_core::vault::NOT_SET;
use sealbox_core::{
    cipher, CredentialName, CredentialSource, CredentialVault, DispatchConfig, Dispatcher, EnvSource,
    MemorySource, ProviderRegistry, ProviderResult, StatusReport,
};
use std::sync::Arc;
use tracing::{debug, info};

use super::types::{MaskedResponse, MessageResponse};
use crate::config::DaemonConfig;

/// Credential source used by the daemon: the process environment or an env file.
pub type DaemonSource = Arc<dyn CredentialSource>;

/// Type alias for the vault used by the daemon.
pub type DaemonVault = CredentialVault<DaemonSource>;

/// Type alias for the dispatcher used by the daemon.
pub type DaemonDispatcher = Dispatcher<DaemonSource>;

/// State shared across RPC handlers.
pub struct ApiState {
    /// Credential vault
    pub vault: Arc<DaemonVault>,
    /// Provider failover dispatcher over the same vault
    pub dispatcher: Arc<DaemonDispatcher>,
}

impl ApiState {
    /// Create API state over `source`.
    ///
    /// `priority` overrides `API_PRIORITY` from the source when set.
    pub fn new(
        source: DaemonSource,
        registry: &ProviderRegistry,
        priority: Option<&str>,
    ) -> Result<Self> {
        let dispatch_config = match priority {
            Some(list) => DispatchConfig::from_priority(list),
            None => DispatchConfig::from_source(&source),
        };

        let vault = Arc::new(
            CredentialVault::from_source(source).context("Failed to initialize credential vault")?,
        );
        let dispatcher = Arc::new(Dispatcher::from_registry(
            vault.clone(),
            registry,
            &dispatch_config,
        ));

        info!("Provider order: {:?}", dispatcher.provider_ids());

        Ok(Self { vault, dispatcher })
    }

    /// Create API state from daemon configuration with the built-in providers.
    pub async fn from_config(config: &DaemonConfig) -> Result<Self> {
        let source: DaemonSource = match &config.env_file {
            Some(path) => {
                info!("Reading credentials from {:?}", path);
                Arc::new(
                    MemorySource::load_env_file(path)
                        .await
                        .with_context(|| format!("Failed to load env file {:?}", path))?,
                )
            }
            None => Arc::new(EnvSource::new()),
        };

        Self::new(
            source,
            &ProviderRegistry::default(),
            config.provider_priority.as_deref(),
        )
    }

    /// Create API state over an in-memory source with no providers registered
    /// (useful for tests; every dispatch returns the demo result).
    pub fn with_source(source: MemorySource) -> Result<Self> {
        Self::new(Arc::new(source), &ProviderRegistry::new(), None)
    }
}

/// JSON-RPC API trait definition.
#[rpc(server)]
pub trait SealboxApi {
    /// Security status of every known provider credential.
    ///
    /// # Returns
    ///
    /// Masked values, per-key classification, metrics and the security score.
    #[method(name = "env_status")]
    async fn env_status(&self) -> RpcResult<StatusReport>;

    /// Masked display form of one credential.
    ///
    /// # Parameters
    ///
    /// - `name`: Credential name (e.g., "OPENAI_API_KEY")
    #[method(name = "masked")]
    async fn masked(&self, name: String) -> RpcResult<MaskedResponse>;

    /// Send a request through the provider failover chain.
    ///
    /// # Parameters
    ///
    /// - `request`: Request text sent to the provider
    /// - `kind`: Request kind label (e.g., "fundamental"), used by the demo fallback
    ///
    /// # Returns
    ///
    /// The first successful provider answer, or the demo result.
    #[method(name = "dispatch")]
    async fn dispatch(&self, request: String, kind: String) -> RpcResult<ProviderResult>;

    /// Drop every cached plaintext credential.
    #[method(name = "clear_cache")]
    async fn clear_cache(&self) -> RpcResult<MessageResponse>;
}

/// Implementation of the Sealbox API.
pub struct SealboxApiImpl {
    state: ApiState,
}

impl SealboxApiImpl {
    /// Create a new API implementation with the given state.
    pub fn new(state: ApiState) -> Self {
        Self { state }
    }
}

#[async_trait::async_trait]
impl SealboxApiServer for SealboxApiImpl {
    async fn env_status(&self) -> RpcResult<StatusReport> {
        debug!("RPC: env_status()");
        let vault = self.state.vault.clone();
        tokio::task::spawn_blocking(move || StatusReport::from_vault(&vault))
            .await
            .map_err(internal_error)
    }

    async fn masked(&self, name: String) -> RpcResult<MaskedResponse> {
        debug!("RPC: masked({})", name);

        if name.trim().is_empty() {
            return Err(ErrorObject::owned(
                ErrorCode::InvalidParams.code(),
                "Credential name must not be empty",
                None::<()>,
            ));
        }

        let masked = match self.state.vault.get_async(&CredentialName::new(&name)).await {
            Some(secret) => cipher::mask_default(secret.expose()),
            None => NOT_SET.to_string(),
        };
        Ok(MaskedResponse { name, masked })
    }

    async fn dispatch(&self, request: String, kind: String) -> RpcResult<ProviderResult> {
        info!("RPC: dispatch(kind: {}, {} chars)", kind, request.chars().count());
        Ok(self.state.dispatcher.dispatch(&request, &kind).await)
    }

    async fn clear_cache(&self) -> RpcResult<MessageResponse> {
        let count = self.state.vault.cached_len();
        info!("RPC: clear_cache() dropping {} entries", count);
        self.state.vault.clear_cache();

        Ok(MessageResponse {
            message: format!("Cleared {} cached credentials", count),
        })
    }
}

/// Wrap any displayable error as a JSON-RPC internal error.
pub fn internal_error<E: std::fmt::Display>(err: E) -> ErrorObject<'static> {
    ErrorObject::owned(
        ErrorCode::InternalError.code(),
        format!("{}", err),
        None::<()>,
    )
}
