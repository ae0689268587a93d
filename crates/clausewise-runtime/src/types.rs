//! Runtime types.

use clausewise_core::{AnalysisResult, Document, DocumentFormat, Error, Result};
use clausewise_ingest::extract_text;
use serde::Serialize;

/// Where the contract text for a request comes from. Resolved once, before
/// any scoring or network call.
#[derive(Debug, Clone)]
pub enum InputMode {
    /// Uploaded bytes; the user text is a question about them.
    Document {
        bytes: Vec<u8>,
        format: DocumentFormat,
        question: Option<String>,
    },
    /// Literal contract text with no separate question.
    Text { text: String },
    /// Question about a previously stored contract.
    FollowUp {
        stored_document: Option<String>,
        question: Option<String>,
    },
}

/// Contract text and question ready for the pipeline.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub document: Document,
    pub question: Option<String>,
    /// Set when the text was extracted from an upload.
    pub extracted: bool,
}

impl InputMode {
    /// Pick the mode from the parts of a request: an upload wins, then a
    /// follow-up on an existing conversation, then literal text.
    pub fn from_parts(
        upload: Option<(Vec<u8>, DocumentFormat)>,
        user_text: Option<String>,
        follow_up: bool,
        stored_document: Option<String>,
    ) -> Self {
        let user_text = user_text.filter(|t| !t.trim().is_empty());
        match upload {
            Some((bytes, format)) => InputMode::Document {
                bytes,
                format,
                question: user_text,
            },
            None if follow_up => InputMode::FollowUp {
                stored_document,
                question: user_text,
            },
            None => InputMode::Text {
                text: user_text.unwrap_or_default(),
            },
        }
    }

    pub fn resolve(self) -> Result<ResolvedInput> {
        match self {
            InputMode::Document {
                bytes,
                format,
                question,
            } => Ok(ResolvedInput {
                document: extract_text(&bytes, format)?,
                question,
                extracted: true,
            }),
            InputMode::Text { text } => {
                if text.trim().is_empty() {
                    return Err(Error::EmptyInput(
                        "either a file or text input must be provided".into(),
                    ));
                }
                Ok(ResolvedInput {
                    document: Document::new(text),
                    question: None,
                    extracted: false,
                })
            }
            InputMode::FollowUp {
                stored_document,
                question,
            } => match (stored_document.filter(|d| !d.trim().is_empty()), question) {
                (Some(stored), question) => Ok(ResolvedInput {
                    document: Document::new(stored),
                    question,
                    extracted: false,
                }),
                // No stored contract: the text itself is what gets analyzed.
                (None, Some(text)) => InputMode::Text { text }.resolve(),
                (None, None) => Err(Error::EmptyInput(
                    "please provide a question or upload a file; this chat has no stored contract".into(),
                )),
            },
        }
    }
}

/// Everything a caller needs after one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    /// The full contract text that was analyzed.
    #[serde(skip)]
    pub document_text: String,
    /// Extracted upload text, when the input was a file.
    #[serde(rename = "extractedText")]
    pub extracted_text: Option<String>,
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_takes_priority() {
        let mode = InputMode::from_parts(
            Some((b"Payment is due.".to_vec(), DocumentFormat::PlainText)),
            Some("When is payment due?".into()),
            true,
            Some("old contract".into()),
        );
        let resolved = mode.resolve().unwrap();
        assert_eq!(resolved.document.text(), "Payment is due.");
        assert_eq!(resolved.question.as_deref(), Some("When is payment due?"));
        assert!(resolved.extracted);
    }

    #[test]
    fn test_text_is_the_contract() {
        let resolved = InputMode::from_parts(None, Some("The fee is $100.".into()), false, None)
            .resolve()
            .unwrap();
        assert_eq!(resolved.document.text(), "The fee is $100.");
        assert!(resolved.question.is_none());
        assert!(!resolved.extracted);
    }

    #[test]
    fn test_follow_up_uses_stored_contract() {
        let resolved = InputMode::from_parts(None, Some("And termination?".into()), true, Some("Stored text.".into()))
            .resolve()
            .unwrap();
        assert_eq!(resolved.document.text(), "Stored text.");
        assert_eq!(resolved.question.as_deref(), Some("And termination?"));
    }

    #[test]
    fn test_follow_up_without_contract_or_question() {
        let err = InputMode::from_parts(None, Some("  ".into()), true, None)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_nothing_provided() {
        let err = InputMode::from_parts(None, None, false, None).resolve().unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn test_empty_upload_is_extraction_error() {
        let err = InputMode::from_parts(Some((Vec::new(), DocumentFormat::Pdf)), None, false, None)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
