//! Hugging Face inference API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{http_error, require_text, TEMPERATURE};
use crate::model::{CredentialName, HUGGINGFACE_API_KEY};
use crate::provider::{Provider, ProviderError};
use crate::source::Secret;

const DEFAULT_API_BASE: &str = "https://api-inference.huggingface.co";

/// Hugging Face hosted inference provider.
#[derive(Debug, Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    credential: CredentialName,
    api_base: String,
    model: String,
}

impl HuggingFaceProvider {
    /// Create a provider for `microsoft/DialoGPT-large`.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            credential: CredentialName::new(HUGGINGFACE_API_KEY),
            api_base: DEFAULT_API_BASE.to_string(),
            model: "microsoft/DialoGPT-large".to_string(),
        }
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

/// The API answers either `[{"generated_text": ..}]` or `{"generated_text": ..}`.
fn generated_text(body: &Value) -> Option<String> {
    body.get(0)
        .and_then(|first| first.get("generated_text"))
        .or_else(|| body.get("generated_text"))
        .and_then(Value::as_str)
        .map(String::from)
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn id(&self) -> &str {
        "huggingface"
    }

    fn credential(&self) -> &CredentialName {
        &self.credential
    }

    async fn call(&self, request: &str, api_key: &Secret) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}", self.api_base.trim_end_matches('/'), self.model);
        let body = InferenceRequest {
            inputs: request,
            parameters: InferenceParameters {
                max_new_tokens: 2000,
                temperature: TEMPERATURE,
                return_full_text: false,
            },
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
            return Err(http_error(response, "Hugging Face API error").await);
        }

        let body: Value = response.json().await?;
        require_text(generated_text(&body), "huggingface")
    }
}
