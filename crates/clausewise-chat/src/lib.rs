//! Contract analysis over an external LLM (Groq/OpenAI/Anthropic).
//!
//! Renders the fixed analysis prompt around a budgeted excerpt, sends it
//! with a single size-limit fallback, and turns the raw reply into an
//! [`clausewise_core::AnalysisResult`]. LLM calls go to external APIs.

pub mod client;
pub mod config;
pub mod prompt;
pub mod providers;
pub mod response;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod types;

pub use client::{Generation, GenerationClient, GenerationSettings};
pub use config::LLMConfig;
pub use providers::{BackendError, CompletionBackend, HttpCompletionBackend};
#[cfg(any(test, feature = "test-util"))]
pub use testing::ScriptedBackend;
pub use types::*;
