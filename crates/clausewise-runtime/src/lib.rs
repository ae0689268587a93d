//! Runtime orchestrator — resolves the request input and runs the pipeline.
//!
//! extraction → keyword expansion → excerpt → prompt → generation → cleanup,
//! one request at a time, sharing only read-only configuration and the
//! completion client.

pub mod orchestrator;
pub mod types;

pub use orchestrator::ContractAnalyzer;
pub use types::*;
