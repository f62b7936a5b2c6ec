//! HTTP adapters for the built-in text-generation providers.
//!
//! Each adapter holds a shared [`reqwest::Client`], a base URL that tests
//! override with a mock server, and the model it requests.

mod chat;
mod cohere;
mod google;
mod huggingface;

pub use chat::ChatCompletionsProvider;
pub use cohere::CohereProvider;
pub use google::GoogleProvider;
pub use huggingface::HuggingFaceProvider;

use reqwest::Response;
use serde::Deserialize;

use crate::provider::ProviderError;

/// Sampling temperature sent by every adapter.
pub(crate) const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Turn a non-success response into a [`ProviderError::Http`].
///
/// OpenAI-shaped bodies (`{"error": {"message": ..}}`) contribute their message;
/// anything else falls back to `fallback`.
pub(crate) async fn http_error(response: Response, fallback: &str) -> ProviderError {
    let status = response.status().as_u16();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) if !body.error.message.is_empty() => body.error.message,
        _ => fallback.to_string(),
    };
    ProviderError::http(status, message)
}

/// Reject absent or empty generated text.
pub(crate) fn require_text(text: Option<String>, provider: &str) -> Result<String, ProviderError> {
    match text {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ProviderError::malformed(format!(
            "{} response contained no generated text",
            provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert_eq!(require_text(Some("hi".into()), "x").unwrap(), "hi");
        assert!(matches!(
            require_text(Some(String::new()), "x"),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(require_text(None, "x").is_err());
    }
}
