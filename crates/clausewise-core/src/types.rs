//! Request-scoped entities shared by every pipeline stage.
//!
//! All lengths are counted in `char`s, never bytes, so budgets hold for
//! non-ASCII contracts too.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CHARS_PER_TOKEN;

/// Declared format of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Detect format from a MIME type (parameters such as `; charset=` are ignored).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "text/plain" | "text/markdown" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Detect format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" => Some(Self::PlainText),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::PlainText => write!(f, "text"),
        }
    }
}

/// Full contract text, immutable once extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    raw_text: String,
}

impl Document {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.raw_text
    }

    pub fn char_len(&self) -> usize {
        self.raw_text.chars().count()
    }

    /// Short SHA-256 hex digest of the text, for log correlation.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.raw_text.as_bytes());
        hex::encode(&digest[..6])
    }

    pub fn into_text(self) -> String {
        self.raw_text
    }
}

/// Lexical query model derived from the user's question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Query {
    pub raw_text: Option<String>,
    /// Lower-cased single words, phrases, variants, synonyms and numbers.
    pub keywords: BTreeSet<String>,
    pub numeric_terms: BTreeSet<String>,
}

impl Query {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Keywords joined by spaces in sorted order.
    pub fn keywords_text(&self) -> String {
        self.keywords
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A sentence or paragraph with its lexical score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredUnit {
    pub unit_text: String,
    /// Index in the original split, stable across re-ranking.
    pub position_index: usize,
    pub score: u32,
}

/// Separator placed between rendered excerpt sections.
pub const SECTION_SEPARATOR: &str = "\n\n";

/// One labeled block of an excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcerptSection {
    pub label: Option<String>,
    pub text: String,
}

impl ExcerptSection {
    pub fn labeled(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            label: None,
            text: text.into(),
        }
    }

    /// Characters taken by the label line (label plus its newline).
    pub fn header_len(&self) -> usize {
        self.label
            .as_ref()
            .map(|l| l.chars().count() + 1)
            .unwrap_or(0)
    }

    pub fn rendered_len(&self) -> usize {
        self.header_len() + self.text.chars().count()
    }

    fn render_into(&self, out: &mut String) {
        if let Some(label) = &self.label {
            out.push_str(label);
            out.push('\n');
        }
        out.push_str(&self.text);
    }
}

/// Bounded-size text passed to the generation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Excerpt {
    pub sections: Vec<ExcerptSection>,
    pub char_budget: usize,
    pub was_truncated: bool,
}

impl Excerpt {
    /// Render sections as `label\ntext` blocks joined by blank lines.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push_str(SECTION_SEPARATOR);
            }
            section.render_into(&mut out);
        }
        out
    }

    /// Length of [`Excerpt::text`] without rendering it.
    pub fn char_len(&self) -> usize {
        let separators = self.sections.len().saturating_sub(1) * SECTION_SEPARATOR.len();
        self.sections
            .iter()
            .map(ExcerptSection::rendered_len)
            .sum::<usize>()
            + separators
    }
}

/// Fully rendered instruction text plus its token estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub rendered_text: String,
    pub estimated_token_count: f64,
}

impl Prompt {
    pub fn new(rendered_text: String) -> Self {
        let estimated_token_count = estimate_tokens(&rendered_text);
        Self {
            rendered_text,
            estimated_token_count,
        }
    }

    pub fn exceeds(&self, token_ceiling: usize) -> bool {
        self.estimated_token_count > token_ceiling as f64
    }
}

/// `chars / 4` token estimate.
pub fn estimate_tokens(text: &str) -> f64 {
    text.chars().count() as f64 / CHARS_PER_TOKEN as f64
}

/// Divider between reasoning and answer in [`AnalysisResult::formatted`].
pub const REASONING_HEADER: &str = "--- Model Reasoning ---";

/// Final displayable analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "mainResponse")]
    pub main_response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(rename = "wasTruncated")]
    pub was_truncated: bool,
}

impl AnalysisResult {
    /// Reasoning first (when present), then a divider, then the answer.
    pub fn formatted(&self) -> String {
        match &self.reasoning {
            Some(reasoning) => format!(
                "{}\n\n{}\n\n{}\n\n{}",
                REASONING_HEADER,
                reasoning,
                "=".repeat(60),
                self.main_response
            ),
            None => self.main_response.clone(),
        }
    }
}
