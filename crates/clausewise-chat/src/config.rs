//! LLM provider configuration and selection.

use std::path::{Path, PathBuf};

use clausewise_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{ChatStatus, LLMProvider};

pub const DEFAULT_CONFIG_FILE: &str = "llm-config.json";

pub const DEFAULT_GROQ_MODEL: &str = "qwen/qwen3-32b";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

pub const GROQ_MODELS: &[&str] = &[
    "qwen/qwen3-32b",
    "llama-3.3-70b-versatile",
    "llama-3.1-8b-instant",
];
pub const OPENAI_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo"];
pub const ANTHROPIC_MODELS: &[&str] = &[
    "claude-sonnet-4-20250514",
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
];

/// Stored LLM configuration (llm-config.json plus environment keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_max_tokens() -> usize {
    3000
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            groq_api_key: None,
            openai_api_key: None,
            anthropic_api_key: None,
            groq_model: default_groq_model(),
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            config_path: PathBuf::new(),
        }
    }
}

impl LLMConfig {
    /// Load from `CLAUSEWISE_LLM_CONFIG` (default `llm-config.json`).
    pub fn from_env() -> Self {
        let path = std::env::var("CLAUSEWISE_LLM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::load(Path::new(&path))
    }

    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config = Self::from_file(config_path);

        if config.groq_api_key.is_none() {
            config.groq_api_key = non_empty_env("GROQ_API_KEY");
        }
        if config.openai_api_key.is_none() {
            config.openai_api_key = non_empty_env("OPENAI_API_KEY");
        }
        if config.anthropic_api_key.is_none() {
            config.anthropic_api_key = non_empty_env("ANTHROPIC_API_KEY");
        }
        if let Some(model) = non_empty_env("GROQ_MODEL") {
            config.groq_model = model;
        }

        config
    }

    /// Parse a JSON config document; absent fields take their defaults.
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// File contents only; a missing file yields defaults.
    pub fn from_file(config_path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(config_path) {
            Ok(s) => Self::parse(&s).unwrap_or_else(|e| {
                warn!("Ignoring malformed {}: {}", config_path.display(), e);
                LLMConfig::default()
            }),
            Err(_) => LLMConfig::default(),
        };
        config.config_path = config_path.to_path_buf();
        config
    }

    /// Resolve which provider, model and key to use.
    pub fn resolve_provider(&self) -> Option<(LLMProvider, String, String)> {
        // Explicit preference
        if self.preferred_provider != "auto" {
            return match self.preferred_provider.as_str() {
                "groq" => self
                    .groq_api_key
                    .as_ref()
                    .map(|k| (LLMProvider::Groq, self.groq_model.clone(), k.clone())),
                "openai" => self
                    .openai_api_key
                    .as_ref()
                    .map(|k| (LLMProvider::OpenAI, self.openai_model.clone(), k.clone())),
                "anthropic" => self
                    .anthropic_api_key
                    .as_ref()
                    .map(|k| (LLMProvider::Anthropic, self.anthropic_model.clone(), k.clone())),
                _ => None,
            };
        }

        // Auto mode: Groq > OpenAI > Anthropic
        if let Some(k) = &self.groq_api_key {
            return Some((LLMProvider::Groq, self.groq_model.clone(), k.clone()));
        }
        if let Some(k) = &self.openai_api_key {
            return Some((LLMProvider::OpenAI, self.openai_model.clone(), k.clone()));
        }
        if let Some(k) = &self.anthropic_api_key {
            return Some((LLMProvider::Anthropic, self.anthropic_model.clone(), k.clone()));
        }

        None
    }

    /// Like [`LLMConfig::resolve_provider`] but a missing key is a startup error.
    pub fn require_provider(&self) -> Result<(LLMProvider, String, String)> {
        let resolved = self.resolve_provider().ok_or_else(|| {
            Error::Config(format!(
                "no API key configured for provider '{}' (set GROQ_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or edit {})",
                self.preferred_provider,
                self.config_path.display()
            ))
        })?;
        info!("Using {} model {}", resolved.0, resolved.1);
        Ok(resolved)
    }

    /// Public status (no API keys exposed).
    pub fn to_status(&self) -> ChatStatus {
        let resolved = self.resolve_provider();
        ChatStatus {
            llm_available: resolved.is_some(),
            llm_provider: resolved.as_ref().map(|(p, _, _)| p.to_string()),
            default_model: resolved.as_ref().map(|(_, m, _)| m.clone()),
            available_models: self.available_models(),
            preferred_provider: self.preferred_provider.clone(),
            groq_configured: self.groq_api_key.is_some(),
            openai_configured: self.openai_api_key.is_some(),
            anthropic_configured: self.anthropic_api_key.is_some(),
        }
    }

    /// Get available models for the active provider.
    pub fn available_models(&self) -> Vec<String> {
        let models = match self.resolve_provider() {
            Some((LLMProvider::Groq, _, _)) => GROQ_MODELS,
            Some((LLMProvider::OpenAI, _, _)) => OPENAI_MODELS,
            Some((LLMProvider::Anthropic, _, _)) => ANTHROPIC_MODELS,
            None => return Vec::new(),
        };
        models.iter().map(|s| s.to_string()).collect()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_auto_prefers_groq() {
        let config = LLMConfig {
            openai_api_key: Some("sk-openai".into()),
            groq_api_key: Some("gsk-groq".into()),
            ..Default::default()
        };
        let (provider, model, key) = config.resolve_provider().unwrap();
        assert_eq!(provider, LLMProvider::Groq);
        assert_eq!(model, DEFAULT_GROQ_MODEL);
        assert_eq!(key, "gsk-groq");
    }

    #[test]
    fn test_explicit_preference_without_key() {
        let config = LLMConfig {
            preferred_provider: "anthropic".into(),
            groq_api_key: Some("gsk-groq".into()),
            ..Default::default()
        };
        assert!(config.resolve_provider().is_none());
        assert!(matches!(config.require_provider(), Err(Error::Config(_))));
        assert!(!config.to_status().llm_available);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"preferred_provider": "openai", "openai_api_key": "sk-test", "max_tokens": 1200}}"#
        )
        .unwrap();

        let config = LLMConfig::from_file(file.path());
        assert_eq!(config.max_tokens, 1200);
        assert_eq!(config.temperature, 0.3);
        let status = config.to_status();
        assert_eq!(status.llm_provider.as_deref(), Some("openai"));
        assert_eq!(status.default_model.as_deref(), Some(DEFAULT_OPENAI_MODEL));
        assert!(status.available_models.contains(&"gpt-4o".to_string()));
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let config = LLMConfig::from_file(file.path());
        assert_eq!(config.preferred_provider, "auto");
        assert_eq!(config.timeout_secs, 120);

        assert!(matches!(LLMConfig::parse("not json"), Err(Error::Json(_))));
    }
}
