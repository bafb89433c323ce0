//! Conversation data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exchange turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationEntry {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered exchange history with one counterparty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Counterparty identifier
    pub counterparty: String,
    entries: Vec<ConversationEntry>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new(counterparty: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            counterparty: counterparty.into(),
            entries: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn
    pub fn push(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
        self.updated_at = Utc::now();
    }

    /// All turns, oldest first
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every turn
    pub fn clear(&mut self) {
        self.entries.clear();
        self.updated_at = Utc::now();
    }

    /// Drop the oldest turns so that at most `window` remain; returns how many were dropped.
    ///
    /// The kept history never starts with an assistant turn, so an odd window
    /// keeps one entry less rather than splitting an exchange.
    pub fn trim_to(&mut self, window: usize) -> usize {
        let mut excess = self.entries.len().saturating_sub(window);
        while excess < self.entries.len() && self.entries[excess].role == Role::Assistant {
            excess += 1;
        }
        if excess > 0 {
            self.entries.drain(..excess);
            self.updated_at = Utc::now();
        }
        excess
    }
}
