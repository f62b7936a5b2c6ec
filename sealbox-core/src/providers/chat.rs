//! OpenAI-compatible chat completions (OpenAI and Groq).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_error, require_text, TEMPERATURE};
use crate::model::{CredentialName, GROQ_API_KEY, OPENAI_API_KEY};
use crate::provider::{Provider, ProviderError};
use crate::source::Secret;

const OPENAI_API_BASE: &str = "https://api.openai.com";
const GROQ_API_BASE: &str = "https://api.groq.com";

/// A provider speaking the OpenAI chat completions protocol.
#[derive(Debug, Clone)]
pub struct ChatCompletionsProvider {
    client: Client,
    id: &'static str,
    credential: CredentialName,
    api_base: String,
    path: &'static str,
    model: String,
    max_tokens: u32,
}

impl ChatCompletionsProvider {
    /// OpenAI: `gpt-3.5-turbo`, up to 3000 tokens.
    pub fn openai(client: Client) -> Self {
        Self {
            client,
            id: "openai",
            credential: CredentialName::new(OPENAI_API_KEY),
            api_base: OPENAI_API_BASE.to_string(),
            path: "/v1/chat/completions",
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 3000,
        }
    }

    /// Groq: `mixtral-8x7b-32768`, up to 2000 tokens.
    pub fn groq(client: Client) -> Self {
        Self {
            client,
            id: "groq",
            credential: CredentialName::new(GROQ_API_KEY),
            api_base: GROQ_API_BASE.to_string(),
            path: "/openai/v1/chat/completions",
            model: "mixtral-8x7b-32768".to_string(),
            max_tokens: 2000,
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

    fn endpoint(&self) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), self.path)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl Provider for ChatCompletionsProvider {
    fn id(&self) -> &str {
        self.id
    }

    fn credential(&self) -> &CredentialName {
        &self.credential
    }

    async fn call(&self, request: &str, api_key: &Secret) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: request,
            }],
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
        };

        debug!("POST {} (model {})", self.endpoint(), self.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(http_error(response, &format!("{} API error", self.id)).await);
        }

        let response: ChatResponse = response.json().await?;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);

        require_text(text, self.id)
    }
}
