//! Static configuration, loaded once at startup.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Character budget for the contract excerpt handed to the model.
pub const DEFAULT_CHAR_BUDGET: usize = 8000;
/// Characters held back for the ending slice when sizing key sections.
pub const DEFAULT_ENDING_RESERVE: usize = 2000;
/// Maximum number of scored sentences considered for key sections.
pub const DEFAULT_MAX_KEY_SENTENCES: usize = 50;
/// A targeted extract smaller than this share of the budget gets topped up.
pub const DEFAULT_TARGETED_FILL_RATIO: f64 = 0.8;
/// Size of the flat first-N excerpt used after a size/rate-limit rejection.
pub const DEFAULT_FALLBACK_CHARS: usize = 5000;
/// The fallback excerpt backs off to a period only past this character.
pub const DEFAULT_FALLBACK_MIN_CUT: usize = 4000;
/// Estimated-token ceiling for a prompt (stays under a 6000-unit service budget).
pub const DEFAULT_TOKEN_CEILING: usize = 5500;
/// Characters per estimated token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Excerpt and prompt sizing. Immutable after [`ExcerptConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcerptConfig {
    pub char_budget: usize,
    pub ending_reserve: usize,
    pub max_key_sentences: usize,
    pub targeted_fill_ratio: f64,
    pub fallback_chars: usize,
    pub fallback_min_cut: usize,
    pub token_ceiling: usize,
}

impl Default for ExcerptConfig {
    fn default() -> Self {
        Self {
            char_budget: DEFAULT_CHAR_BUDGET,
            ending_reserve: DEFAULT_ENDING_RESERVE,
            max_key_sentences: DEFAULT_MAX_KEY_SENTENCES,
            targeted_fill_ratio: DEFAULT_TARGETED_FILL_RATIO,
            fallback_chars: DEFAULT_FALLBACK_CHARS,
            fallback_min_cut: DEFAULT_FALLBACK_MIN_CUT,
            token_ceiling: DEFAULT_TOKEN_CEILING,
        }
    }
}

impl ExcerptConfig {
    /// Defaults overridden by `CLAUSEWISE_CHAR_BUDGET` / `CLAUSEWISE_TOKEN_CEILING`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(budget) = env_usize("CLAUSEWISE_CHAR_BUDGET")? {
            config.char_budget = budget;
        }
        if let Some(ceiling) = env_usize("CLAUSEWISE_TOKEN_CEILING")? {
            config.token_ceiling = ceiling;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the excerpt builder cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.char_budget <= self.ending_reserve {
            return Err(Error::Config(format!(
                "char_budget ({}) must exceed ending_reserve ({})",
                self.char_budget, self.ending_reserve
            )));
        }
        if self.max_key_sentences == 0 {
            return Err(Error::Config("max_key_sentences must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.targeted_fill_ratio) {
            return Err(Error::Config(
                "targeted_fill_ratio must be in [0.0, 1.0]".into(),
            ));
        }
        if self.fallback_min_cut >= self.fallback_chars {
            return Err(Error::Config(format!(
                "fallback_min_cut ({}) must be below fallback_chars ({})",
                self.fallback_min_cut, self.fallback_chars
            )));
        }
        if self.token_ceiling == 0 {
            return Err(Error::Config("token_ceiling must be > 0".into()));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3004);
        Self { port }
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be a positive integer, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
