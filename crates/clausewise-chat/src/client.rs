//! Token preflight, dispatch and the single size fallback.
//!
//! This is the only component that awaits the network. Dropping the returned
//! future aborts the in-flight request.

use std::sync::Arc;

use clausewise_core::config::CHARS_PER_TOKEN;
use clausewise_core::{Document, Error, Excerpt, Prompt, Result};
use clausewise_ingest::{shrink, ExcerptBuilder};
use tracing::{debug, error, info, warn};

use crate::config::LLMConfig;
use crate::prompt::{self, SYSTEM_MESSAGE};
use crate::providers::{BackendError, CompletionBackend, HttpCompletionBackend};
use crate::types::{ChatMessage, CompletionRequest};

/// Share of the remaining token room actually used when shrinking.
const PREFLIGHT_SAFETY: f64 = 0.9;

const TOO_LARGE_MESSAGE: &str = "Contract is too large to analyze even after truncation. \
Please try a shorter contract or split it into sections.";

/// Raw model text plus how the excerpt behind it was cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub raw_text: String,
    pub was_truncated: bool,
    pub used_fallback: bool,
}

/// Fixed sampling settings for every call.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: usize,
}

pub struct GenerationClient {
    backend: Arc<dyn CompletionBackend>,
    settings: GenerationSettings,
    builder: ExcerptBuilder,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, settings: GenerationSettings, builder: ExcerptBuilder) -> Self {
        Self {
            backend,
            settings,
            builder,
        }
    }

    /// Build an HTTP-backed client for the configured provider.
    /// Fails with [`Error::Config`] when no provider has a key.
    pub fn from_config(config: &LLMConfig, builder: ExcerptBuilder) -> Result<Self> {
        let (provider, model, api_key) = config.require_provider()?;
        let backend = HttpCompletionBackend::new(provider, api_key, config.timeout_secs)?;
        let settings = GenerationSettings {
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };
        Ok(Self::new(Arc::new(backend), settings, builder))
    }

    pub fn builder(&self) -> &ExcerptBuilder {
        &self.builder
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Send `excerpt` (taken from `document`) with the optional question.
    ///
    /// A size or rate-limit rejection triggers exactly one retry with the flat
    /// fallback excerpt; if that fails too the result is
    /// [`Error::PayloadTooLarge`]. Any other failure is
    /// [`Error::GenerationFailed`] with no retry.
    pub async fn generate(&self, document: &Document, excerpt: Excerpt, question: Option<&str>) -> Result<Generation> {
        let (prompt, excerpt) = self.preflight(excerpt, question)?;

        match self.dispatch(&prompt).await {
            Ok(raw_text) => Ok(Generation {
                raw_text,
                was_truncated: excerpt.was_truncated,
                used_fallback: false,
            }),
            Err(BackendError::Limit(msg)) => {
                warn!("Service rejected prompt ({}), retrying with fallback excerpt", msg);
                self.generate_fallback(document, question).await
            }
            Err(BackendError::Other(msg)) => {
                error!("Generation failed: {}", msg);
                Err(Error::GenerationFailed(msg))
            }
        }
    }

    async fn generate_fallback(&self, document: &Document, question: Option<&str>) -> Result<Generation> {
        let fallback = self.builder.fallback(document);
        let (prompt, _) = self.preflight(fallback, question)?;

        match self.dispatch(&prompt).await {
            Ok(raw_text) => {
                info!("Fallback excerpt accepted");
                Ok(Generation {
                    raw_text,
                    was_truncated: true,
                    used_fallback: true,
                })
            }
            Err(e) => {
                error!("Fallback attempt failed: {}", e);
                Err(Error::PayloadTooLarge(TOO_LARGE_MESSAGE.into()))
            }
        }
    }

    /// Render the prompt; when its estimate is over the ceiling, shrink the
    /// excerpt into the remaining room once and re-check.
    fn preflight(&self, excerpt: Excerpt, question: Option<&str>) -> Result<(Prompt, Excerpt)> {
        let ceiling = self.builder.config().token_ceiling;
        let prompt = prompt::render(&excerpt, question);
        debug!("Prompt estimate: {:.0} tokens (ceiling {})", prompt.estimated_token_count, ceiling);
        if !prompt.exceeds(ceiling) {
            return Ok((prompt, excerpt));
        }

        // Shrinking always marks the excerpt truncated, so size the room with the note included.
        let overhead_tokens = prompt::overhead_chars(true, question) as f64 / CHARS_PER_TOKEN as f64;
        let remaining_tokens = ceiling as f64 - overhead_tokens;
        if remaining_tokens <= 0.0 {
            return Err(Error::PayloadTooLarge(format!(
                "prompt template and question alone need {:.0} tokens (ceiling {})",
                overhead_tokens, ceiling
            )));
        }

        let max_chars = (remaining_tokens * CHARS_PER_TOKEN as f64 * PREFLIGHT_SAFETY) as usize;
        let mut shrunk = shrink(&excerpt, max_chars);
        shrunk.was_truncated = true;
        info!(
            "Prompt over ceiling ({:.0} tokens), excerpt shrunk {} -> {} chars",
            prompt.estimated_token_count,
            excerpt.char_len(),
            shrunk.char_len()
        );

        let prompt = prompt::render(&shrunk, question);
        if prompt.exceeds(ceiling) {
            return Err(Error::PayloadTooLarge(format!(
                "prompt still needs {:.0} tokens after shrinking (ceiling {})",
                prompt.estimated_token_count, ceiling
            )));
        }
        Ok((prompt, shrunk))
    }

    async fn dispatch(&self, prompt: &Prompt) -> std::result::Result<String, BackendError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_MESSAGE),
                ChatMessage::user(prompt.rendered_text.clone()),
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        self.backend.complete(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;
    use clausewise_core::{ExcerptConfig, Query};

    fn settings() -> GenerationSettings {
        GenerationSettings {
            model: "test-model".into(),
            temperature: 0.3,
            max_tokens: 3000,
        }
    }

    fn long_contract() -> Document {
        Document::new("The Client shall pay the fee within 30 days of invoice. ".repeat(300))
    }

    fn client_with(backend: Arc<ScriptedBackend>, config: ExcerptConfig) -> GenerationClient {
        GenerationClient::new(backend, settings(), ExcerptBuilder::new(config))
    }

    #[tokio::test]
    async fn test_success_sends_system_and_user_messages() {
        let backend = Arc::new(ScriptedBackend::new([Ok("Main answer.".to_string())]));
        let client = client_with(backend.clone(), ExcerptConfig::default());
        let document = Document::new("Payment shall be $500.");
        let excerpt = client.builder().compose(&document, &Query::empty());

        let generation = client.generate(&document, excerpt, Some("Is it fair?")).await.unwrap();
        assert_eq!(generation.raw_text, "Main answer.");
        assert!(!generation.was_truncated);
        assert!(!generation.used_fallback);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, "system");
        assert_eq!(requests[0].messages[1].role, "user");
        assert!(requests[0].messages[1].content.contains("Payment shall be $500."));
        assert_eq!(requests[0].temperature, 0.3);
        assert_eq!(requests[0].max_tokens, 3000);
    }

    #[tokio::test]
    async fn test_limit_error_falls_back_once() {
        let backend = Arc::new(ScriptedBackend::new([
            Err(BackendError::Limit("rate_limit_exceeded".into())),
            Ok("Short answer.".to_string()),
        ]));
        let client = client_with(backend.clone(), ExcerptConfig::default());
        let document = long_contract();
        let excerpt = client.builder().compose(&document, &Query::empty());

        let generation = client.generate(&document, excerpt, None).await.unwrap();
        assert!(generation.was_truncated);
        assert!(generation.used_fallback);
        assert_eq!(backend.call_count(), 2);

        let retry = &backend.requests()[1].messages[1].content;
        let contract = retry.split(prompt::CONTRACT_HEADING).nth(1).unwrap();
        assert!(contract.chars().count() < 5000 + prompt::CLOSING_INSTRUCTION.len() + 16);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_payload_too_large() {
        let backend = Arc::new(ScriptedBackend::new([
            Err(BackendError::Limit("Request too large".into())),
            Err(BackendError::Limit("Request too large".into())),
        ]));
        let client = client_with(backend.clone(), ExcerptConfig::default());
        let document = long_contract();
        let excerpt = client.builder().build(document.text());

        let err = client.generate(&document, excerpt, None).await.unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge(_)));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let backend = Arc::new(ScriptedBackend::new([Err(BackendError::Other("API error 401".into()))]));
        let client = client_with(backend.clone(), ExcerptConfig::default());
        let document = Document::new("Payment shall be $500.");
        let excerpt = client.builder().build(document.text());

        let err = client.generate(&document, excerpt, None).await.unwrap_err();
        assert!(matches!(err, Error::GenerationFailed(_)));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_preflight_shrinks_oversized_prompt() {
        let backend = Arc::new(ScriptedBackend::new([Ok("ok".to_string())]));
        let config = ExcerptConfig {
            token_ceiling: 2000,
            ..Default::default()
        };
        let client = client_with(backend.clone(), config);
        let document = long_contract();
        let excerpt = client.builder().build(document.text());

        let generation = client.generate(&document, excerpt, None).await.unwrap();
        assert!(generation.was_truncated);
        let sent = &backend.requests()[0].messages[1].content;
        assert!(sent.chars().count() as f64 / 4.0 <= 2000.0);
    }

    #[tokio::test]
    async fn test_preflight_gives_up_without_network_call() {
        let backend = Arc::new(ScriptedBackend::new([Ok("unused".to_string())]));
        let config = ExcerptConfig {
            token_ceiling: 100,
            ..Default::default()
        };
        let client = client_with(backend.clone(), config);
        let document = long_contract();
        let excerpt = client.builder().build(document.text());

        let err = client.generate(&document, excerpt, None).await.unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge(_)));
        assert_eq!(backend.call_count(), 0);
    }
}
