//! External LLM provider completion calls.
//!
//! OpenAI and Groq share the chat-completions format. Anthropic uses its own
//! Messages API with the system prompt as a separate field.

use std::time::Duration;

use async_trait::async_trait;
use clausewise_core::{Error, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use crate::types::{CompletionRequest, LLMProvider};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Failure reported by a completion backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The service rejected the request for its size or the caller's rate budget.
    #[error("size or rate limit exceeded: {0}")]
    Limit(String),
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Classify an error response by status code and body text.
    pub fn classify(status: Option<u16>, body: &str) -> Self {
        let limited = matches!(status, Some(413) | Some(429))
            || body.contains("rate_limit_exceeded")
            || body.contains("Request too large");
        let message = match status {
            Some(code) => format!("API error {}: {}", code, body),
            None => body.to_string(),
        };
        if limited {
            BackendError::Limit(message)
        } else {
            BackendError::Other(message)
        }
    }
}

/// A service that turns a completion request into text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, BackendError>;
}

/// reqwest-backed client for one provider. The inner client is shared
/// across concurrent requests.
pub struct HttpCompletionBackend {
    client: Client,
    provider: LLMProvider,
    api_key: String,
}

impl HttpCompletionBackend {
    pub fn new(provider: LLMProvider, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            provider,
            api_key: api_key.into(),
        })
    }

    async fn complete_openai_compat(
        &self,
        url: &str,
        request: &CompletionRequest,
    ) -> std::result::Result<String, BackendError> {
        let body = json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        debug!("Completing via {} with model {}", url, request.model);

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Other(format!("Request failed: {}", e)))?;

        let parsed = read_json(response).await?;
        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::Other("response had no message content".into()))
    }

    async fn complete_anthropic(&self, request: &CompletionRequest) -> std::result::Result<String, BackendError> {
        // Separate system message from conversation
        let system_msg = request
            .messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.clone());
        let conv_msgs: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();

        let mut body = json!({
            "model": request.model,
            "messages": conv_msgs,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if let Some(sys) = system_msg {
            body["system"] = json!(sys);
        }

        debug!("Completing via Anthropic with model {}", request.model);

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Other(format!("Request failed: {}", e)))?;

        let parsed = read_json(response).await?;
        let text: String = parsed["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"] == "text")
                    .filter_map(|b| b["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(BackendError::Other("response had no text content".into()));
        }
        Ok(text)
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, BackendError> {
        match self.provider {
            LLMProvider::Groq => self.complete_openai_compat(GROQ_URL, request).await,
            LLMProvider::OpenAI => self.complete_openai_compat(OPENAI_URL, request).await,
            LLMProvider::Anthropic => self.complete_anthropic(request).await,
        }
    }
}

async fn read_json(response: reqwest::Response) -> std::result::Result<serde_json::Value, BackendError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| BackendError::Other(format!("Response read error: {}", e)))?;

    if !status.is_success() {
        let err = BackendError::classify(Some(status.as_u16()), &body);
        error!("{}", err);
        return Err(err);
    }

    serde_json::from_str(&body).map_err(|e| BackendError::Other(format!("Malformed response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_limits() {
        assert!(matches!(BackendError::classify(Some(429), "slow down"), BackendError::Limit(_)));
        assert!(matches!(BackendError::classify(Some(413), ""), BackendError::Limit(_)));
        assert!(matches!(
            BackendError::classify(Some(400), r#"{"error":{"code":"rate_limit_exceeded"}}"#),
            BackendError::Limit(_)
        ));
        assert!(matches!(
            BackendError::classify(None, "Request too large for model"),
            BackendError::Limit(_)
        ));
        assert!(matches!(BackendError::classify(Some(401), "invalid key"), BackendError::Other(_)));
        assert!(matches!(BackendError::classify(Some(500), "oops"), BackendError::Other(_)));
    }
}
