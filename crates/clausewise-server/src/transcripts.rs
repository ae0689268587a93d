//! In-memory conversation transcripts, scoped per caller.
//!
//! Keeps the contract text of each conversation so follow-up questions can
//! be answered without re-uploading. Nothing survives a restart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub id: Uuid,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TranscriptMessage {
    pub fn new(role: &str, content: impl Into<String>, reasoning: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: role.to_string(),
            content: content.into(),
            reasoning,
            created_at: Utc::now(),
        }
    }
}

/// A saved conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: Uuid,
    pub user_id: String,
    pub title: Option<String>,
    pub contract_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<TranscriptMessage>,
}

#[derive(Default)]
pub struct TranscriptStore {
    chats: RwLock<HashMap<Uuid, ChatRecord>>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        user_id: &str,
        title: Option<String>,
        contract_text: Option<String>,
        messages: Vec<TranscriptMessage>,
    ) -> Uuid {
        let now = Utc::now();
        let record = ChatRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title,
            contract_text,
            created_at: now,
            updated_at: now,
            messages,
        };
        let id = record.id;
        self.chats.write().insert(id, record);
        id
    }

    /// A chat owned by `user_id`; other callers' chats are invisible.
    pub fn get(&self, id: Uuid, user_id: &str) -> Option<ChatRecord> {
        self.chats
            .read()
            .get(&id)
            .filter(|c| c.user_id == user_id)
            .cloned()
    }

    /// Most recently updated first, paged.
    pub fn list(&self, user_id: &str, skip: usize, limit: usize) -> (Vec<ChatRecord>, usize) {
        let chats = self.chats.read();
        let mut owned: Vec<&ChatRecord> = chats.values().filter(|c| c.user_id == user_id).collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let total = owned.len();
        let page = owned.into_iter().skip(skip).take(limit).cloned().collect();
        (page, total)
    }

    pub fn stored_contract(&self, id: Uuid, user_id: &str) -> Option<String> {
        self.get(id, user_id).and_then(|c| c.contract_text)
    }

    /// Append turns, optionally replacing the stored contract. Returns false
    /// when the chat does not exist for this caller.
    pub fn append(
        &self,
        id: Uuid,
        user_id: &str,
        messages: Vec<TranscriptMessage>,
        contract_text: Option<String>,
    ) -> bool {
        let mut chats = self.chats.write();
        let Some(chat) = chats.get_mut(&id).filter(|c| c.user_id == user_id) else {
            return false;
        };
        if contract_text.is_some() {
            chat.contract_text = contract_text;
        }
        chat.messages.extend(messages);
        chat.updated_at = Utc::now();
        true
    }

    pub fn delete(&self, id: Uuid, user_id: &str) -> bool {
        let mut chats = self.chats.write();
        match chats.get(&id) {
            Some(chat) if chat.user_id == user_id => {
                chats.remove(&id);
                true
            }
            _ => false,
        }
    }
}
