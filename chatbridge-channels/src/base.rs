//! Base traits for session transports

use async_trait::async_trait;
use chatbridge_core::bus::{InboundMessage, OutboundMessage};
use chatbridge_core::session::LifecycleEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a network session reports to its owner
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Lifecycle(LifecycleEvent),
    Message(InboundMessage),
}

/// Sending half handed to a transport on connect
pub type EventSender = mpsc::Sender<SessionEvent>;

/// One live connection to the messaging network for one bot.
///
/// A transport connects once. When the connection ends for any reason it
/// reports [`LifecycleEvent::Disconnected`] and stays down; reconnection is
/// the owner's job and always uses a fresh transport.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Name of the bot session this transport serves
    fn session(&self) -> &str;

    /// Begin connecting in the background; events flow into `events`
    async fn connect(&self, events: EventSender) -> Result<()>;

    /// Deliver a reply
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Tear the connection down; no further events are reported
    async fn close(&self) -> Result<()>;
}

/// Builds fresh transports for named sessions
pub trait TransportFactory: Send + Sync {
    fn create(&self, session: &str) -> Arc<dyn SessionTransport>;
}

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel error: {0}")]
    Error(String),

    #[error("Channel not running: {0}")]
    NotRunning(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

impl From<ChannelError> for chatbridge_core::Error {
    fn from(e: ChannelError) -> Self {
        chatbridge_core::Error::Channel(e.to_string())
    }
}

/// Sender allow-list (empty = allow all)
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    allow_from: Vec<String>,
}

impl AllowList {
    pub fn new(allow_from: Vec<String>) -> Self {
        Self { allow_from }
    }

    /// Check if a sender is allowed
    pub fn is_allowed(&self, sender_id: &str) -> bool {
        if self.allow_from.is_empty() {
            return true;
        }

        if self.allow_from.iter().any(|id| id == sender_id) {
            return true;
        }

        // Handle compound IDs (e.g., "12345|username")
        if sender_id.contains('|') {
            return sender_id
                .split('|')
                .any(|part| !part.is_empty() && self.allow_from.iter().any(|id| id == part));
        }

        false
    }
}
