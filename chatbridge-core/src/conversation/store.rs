//! Per-session store of counterparty conversations

use super::entry::{Conversation, ConversationEntry};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A conversation guarded for the duration of one exchange turn
pub type SharedConversation = Arc<Mutex<Conversation>>;

/// Maps counterparty identity to its exchange history.
///
/// Each conversation sits behind its own async mutex, so a turn can hold it
/// across the chat completion call while other counterparties proceed.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, SharedConversation>>,
}

impl ConversationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or lazily create the conversation for a counterparty
    pub fn conversation(&self, counterparty: &str) -> SharedConversation {
        if let Some(existing) = self.conversations.read().get(counterparty) {
            return existing.clone();
        }

        self.conversations
            .write()
            .entry(counterparty.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Conversation::new(counterparty))))
            .clone()
    }

    /// Snapshot of a counterparty's history; empty when none exists
    pub async fn history(&self, counterparty: &str) -> Vec<ConversationEntry> {
        let conversation = self.conversations.read().get(counterparty).cloned();
        match conversation {
            Some(conversation) => conversation.lock().await.entries().to_vec(),
            None => Vec::new(),
        }
    }

    /// Replace a counterparty's history with an empty one
    pub async fn reset(&self, counterparty: &str) {
        self.conversation(counterparty).lock().await.clear();
    }

    /// Counterparties seen so far, sorted
    pub fn counterparties(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.conversations.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of known counterparties
    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}
