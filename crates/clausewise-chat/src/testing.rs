//! Scripted completion backend for tests in this and downstream crates.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::providers::{BackendError, CompletionBackend};
use crate::types::CompletionRequest;

/// In-process backend that replays canned replies in order and records every
/// request it receives. Runs without network access.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<std::result::Result<String, BackendError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = std::result::Result<String, BackendError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, BackendError> {
        self.requests.lock().push(request.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Other("no scripted reply left".into())))
    }
}
