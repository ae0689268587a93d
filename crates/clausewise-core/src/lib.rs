//! Clausewise Core — error taxonomy, static configuration, request-scoped entities.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ExcerptConfig, ServerConfig};
pub use error::{Error, Result};
pub use types::*;
