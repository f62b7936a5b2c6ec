//! Google Gemini generateContent API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_error, require_text};
use crate::model::{CredentialName, GOOGLE_AI_API_KEY};
use crate::provider::{Provider, ProviderError};
use crate::source::Secret;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini provider. The key travels as a query parameter.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client: Client,
    credential: CredentialName,
    api_base: String,
    model: String,
}

impl GoogleProvider {
    /// Create a provider for `gemini-1.5-flash`.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            credential: CredentialName::new(GOOGLE_AI_API_KEY),
            api_base: DEFAULT_API_BASE.to_string(),
            model: "gemini-1.5-flash".to_string(),
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
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl Provider for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    fn credential(&self) -> &CredentialName {
        &self.credential
    }

    async fn call(&self, request: &str, api_key: &Secret) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        );
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: request }],
            }],
        };

        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key.expose())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(http_error(response, "Google AI API error").await);
        }

        let response: GenerateContentResponse = response.json().await?;
        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text);

        require_text(text, "google")
    }
}
