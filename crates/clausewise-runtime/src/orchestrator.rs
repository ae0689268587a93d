//! Runs one analysis request end to end.

use std::sync::Arc;

use clausewise_chat::{response, CompletionBackend, GenerationClient, GenerationSettings, LLMConfig};
use clausewise_core::{ExcerptConfig, Result};
use clausewise_ingest::{expand, ExcerptBuilder};
use tracing::{debug, info};

use crate::types::{AnalysisOutcome, InputMode, ResolvedInput};

/// Pipeline entry point shared by every request. Holds only read-only
/// configuration and the completion client.
pub struct ContractAnalyzer {
    client: GenerationClient,
}

impl ContractAnalyzer {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    /// HTTP-backed analyzer for the configured provider. Fails when no
    /// provider has credentials.
    pub fn from_config(excerpt: ExcerptConfig, llm: &LLMConfig) -> Result<Self> {
        excerpt.validate()?;
        let client = GenerationClient::from_config(llm, ExcerptBuilder::new(excerpt))?;
        info!("Contract analyzer ready (model {})", client.model());
        Ok(Self::new(client))
    }

    /// Analyzer over an arbitrary completion backend.
    pub fn with_backend(
        backend: Arc<dyn CompletionBackend>,
        settings: GenerationSettings,
        excerpt: ExcerptConfig,
    ) -> Self {
        Self::new(GenerationClient::new(backend, settings, ExcerptBuilder::new(excerpt)))
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Resolve the input, build the excerpt, generate and clean up the reply.
    /// Input errors surface before any network call.
    pub async fn analyze(&self, input: InputMode) -> Result<AnalysisOutcome> {
        let resolved = input.resolve()?;
        self.run(resolved).await
    }

    /// Pipeline for input that is already resolved (e.g. a file read by the CLI).
    pub async fn run(&self, resolved: ResolvedInput) -> Result<AnalysisOutcome> {
        let document = resolved.document;
        let question = resolved.question.as_deref();
        let fingerprint = document.fingerprint();

        info!(
            "Analyzing contract {} ({} chars, question: {})",
            fingerprint,
            document.char_len(),
            question.is_some()
        );

        let query = expand(question);
        let excerpt = self.client.builder().compose(&document, &query);
        debug!(
            "Excerpt for {}: {} chars in {} sections, truncated={}",
            fingerprint,
            excerpt.char_len(),
            excerpt.sections.len(),
            excerpt.was_truncated
        );

        let generation = self.client.generate(&document, excerpt, question).await?;
        let result = response::process(&generation.raw_text, generation.was_truncated, generation.used_fallback);

        info!(
            "Analysis {} complete: truncated={}, fallback={}, reasoning={}",
            fingerprint,
            result.was_truncated,
            generation.used_fallback,
            result.reasoning.is_some()
        );

        let extracted_text = resolved.extracted.then(|| document.text().to_string());
        Ok(AnalysisOutcome {
            result,
            document_text: document.into_text(),
            extracted_text,
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clausewise_chat::response::FALLBACK_DISCLOSURE;
    use clausewise_chat::{BackendError, ScriptedBackend};
    use clausewise_core::{DocumentFormat, Error};

    fn analyzer(backend: Arc<ScriptedBackend>) -> ContractAnalyzer {
        let settings = GenerationSettings {
            model: "test-model".into(),
            temperature: 0.3,
            max_tokens: 3000,
        };
        ContractAnalyzer::with_backend(backend, settings, ExcerptConfig::default())
    }

    #[tokio::test]
    async fn test_empty_upload_never_reaches_backend() {
        let backend = Arc::new(ScriptedBackend::new([Ok("unused".to_string())]));
        let analyzer = analyzer(backend.clone());

        let input = InputMode::Document {
            bytes: Vec::new(),
            format: DocumentFormat::Pdf,
            question: Some("Is this fair?".into()),
        };
        let err = analyzer.analyze(input).await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_with_question() {
        let backend = Arc::new(ScriptedBackend::new([Ok(
            "<reasoning>Checked clause 2.</reasoning>\n\n**Payment** is due in 30 days.".to_string(),
        )]));
        let analyzer = analyzer(backend.clone());

        let input = InputMode::Document {
            bytes: b"1. Payment. The Client pays within 30 days of invoice.".to_vec(),
            format: DocumentFormat::PlainText,
            question: Some("When is payment due?".into()),
        };
        let outcome = analyzer.analyze(input).await.unwrap();

        assert_eq!(outcome.result.main_response.lines().last(), Some("Payment is due in 30 days."));
        assert_eq!(outcome.result.reasoning.as_deref(), Some("Checked clause 2."));
        assert!(outcome.extracted_text.is_some());
        assert_eq!(outcome.fingerprint.len(), 12);

        let prompt = &backend.requests()[0].messages[1].content;
        assert!(prompt.contains("When is payment due?"));
        assert!(prompt.contains("The Client pays within 30 days"));
    }

    #[tokio::test]
    async fn test_rate_limit_then_fallback_success() {
        let backend = Arc::new(ScriptedBackend::new([
            Err(BackendError::Limit("rate_limit_exceeded".into())),
            Ok("Short analysis.".to_string()),
        ]));
        let analyzer = analyzer(backend.clone());

        let contract = "The Licensee shall pay royalties every quarter as agreed. ".repeat(400);
        let outcome = analyzer.analyze(InputMode::Text { text: contract }).await.unwrap();

        assert!(outcome.result.was_truncated);
        assert!(outcome.result.main_response.starts_with(FALLBACK_DISCLOSURE));
        assert!(outcome.result.main_response.ends_with("Short analysis."));
        assert_eq!(backend.call_count(), 2);
        assert!(outcome.extracted_text.is_none());
    }

    #[tokio::test]
    async fn test_follow_up_without_anything_is_empty_input() {
        let backend = Arc::new(ScriptedBackend::default());
        let analyzer = analyzer(backend.clone());

        let input = InputMode::FollowUp {
            stored_document: None,
            question: None,
        };
        let err = analyzer.analyze(input).await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
        assert_eq!(backend.call_count(), 0);
    }
}
