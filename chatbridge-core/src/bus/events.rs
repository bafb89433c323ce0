//! Event types for inbound and outbound chat messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message received by a bot session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Name of the bot session that received the message
    pub session: String,
    /// Counterparty identifier (phone number part of the sender JID)
    pub sender_id: String,
    /// Chat identifier used to address the reply (full JID)
    pub chat_id: String,
    /// Message text content
    pub content: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
    /// Bridge-specific metadata
    pub metadata: HashMap<String, serde_json::Value>,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(
        session: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session: session.into(),
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Key under which messages of one counterparty are serialized
    pub fn conversation_key(&self) -> String {
        format!("{}:{}", self.session, self.sender_id)
    }

    /// Add metadata to the message
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the reply addressed to the chat this message came from
    pub fn reply(&self, content: impl Into<String>) -> OutboundMessage {
        OutboundMessage::new(&self.session, &self.chat_id, content)
    }
}

/// Message to send through a bot session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Name of the sending bot session
    pub session: String,
    /// Target chat identifier
    pub chat_id: String,
    /// Message text content
    pub content: String,
}

impl OutboundMessage {
    /// Create a new outbound message
    pub fn new(
        session: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session: session.into(),
            chat_id: chat_id.into(),
            content: content.into(),
        }
    }
}
