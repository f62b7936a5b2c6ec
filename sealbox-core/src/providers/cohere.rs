//! Cohere generate API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_error, require_text, TEMPERATURE};
use crate::model::{COHERE_API_KEY, CredentialName};
use crate::provider::{Provider, ProviderError};
use crate::source::Secret;

const DEFAULT_API_BASE: &str = "https://api.cohere.ai";

/// Cohere text generation provider.
#[derive(Debug, Clone)]
pub struct CohereProvider {
    client: Client,
    credential: CredentialName,
    api_base: String,
    model: String,
}

impl CohereProvider {
    /// Create a provider for the `command` model.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            credential: CredentialName::new(COHERE_API_KEY),
            api_base: DEFAULT_API_BASE.to_string(),
            model: "command".to_string(),
        }
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generations: Vec<Generation>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    text: Option<String>,
}

#[async_trait]
impl Provider for CohereProvider {
    fn id(&self) -> &str {
        "cohere"
    }

    fn credential(&self) -> &CredentialName {
        &self.credential
    }

    async fn call(&self, request: &str, api_key: &Secret) -> Result<String, ProviderError> {
        let url = format!("{}/v1/generate", self.api_base.trim_end_matches('/'));
        let body = GenerateRequest {
            model: &self.model,
            prompt: request,
            max_tokens: 2000,
            temperature: TEMPERATURE,
        };

        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(http_error(response, "Cohere API error").await);
        }

        let response: GenerateResponse = response.json().await?;
        let text = response.generations.into_iter().next().and_then(|g| g.text);
        require_text(text, "cohere")
    }
}
