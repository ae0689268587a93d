//! Shared application state.

use clausewise_chat::LLMConfig;
use clausewise_runtime::ContractAnalyzer;

use crate::transcripts::TranscriptStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub analyzer: ContractAnalyzer,
    pub llm_config: LLMConfig,
    pub transcripts: TranscriptStore,
}

impl AppState {
    pub fn new(analyzer: ContractAnalyzer, llm_config: LLMConfig) -> Self {
        Self {
            analyzer,
            llm_config,
            transcripts: TranscriptStore::new(),
        }
    }
}
