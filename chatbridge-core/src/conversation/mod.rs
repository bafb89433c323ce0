//! Conversation history kept per counterparty
//!
//! History lives in memory only and is scoped to one bot session.

pub mod entry;
pub mod store;

pub use entry::{Conversation, ConversationEntry, Role};
pub use store::{ConversationStore, SharedConversation};
