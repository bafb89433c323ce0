//! Context assembly for chat completion requests

use chatbridge_core::conversation::ConversationEntry;
use chatbridge_providers::Message;

/// Build the message list for one conversational turn: prior history in
/// order, then the new user input.
pub fn build_messages(history: &[ConversationEntry], current_message: &str) -> Vec<Message> {
    let mut messages: Vec<Message> = history.iter().map(Message::from).collect();
    messages.push(Message::user(current_message));
    messages
}
