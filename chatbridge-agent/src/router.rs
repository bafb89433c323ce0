//! Command router: built-in directives and conversational turns

use chatbridge_core::conversation::{ConversationEntry, ConversationStore};
use chatbridge_providers::{ContentSource, LLMProvider};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::build_messages;

/// Leading character that marks a directive
pub const COMMAND_PREFIX: char = '!';

pub const HELP_TEXT: &str = "List of commands:\n\
!help - Show this help message\n\
!joke - Tell a joke\n\
!quote - Get an inspirational quote\n\
!reset - Reset the conversation history";

pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command. Type !help for a list of commands.";
pub const JOKE_FALLBACK: &str = "Sorry, I couldn't fetch a joke at this time.";
pub const QUOTE_FALLBACK: &str = "Sorry, I couldn't fetch a quote at this time.";
pub const RESET_REPLY: &str = "Conversation history has been reset.";
pub const CHAT_FALLBACK: &str = "Sorry, I encountered an error while processing your request.";

/// Built-in directives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Joke,
    Quote,
    Reset,
}

impl Command {
    fn lookup(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "help" => Some(Command::Help),
            "joke" => Some(Command::Joke),
            "quote" => Some(Command::Quote),
            "reset" => Some(Command::Reset),
            _ => None,
        }
    }
}

/// Classification of one inbound text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command { command: Command, args: Vec<String> },
    UnknownCommand(String),
    FreeForm(String),
}

impl Input {
    pub fn parse(text: &str) -> Self {
        let Some(rest) = text.strip_prefix(COMMAND_PREFIX) else {
            return Input::FreeForm(text.to_string());
        };

        let mut words = rest.split_whitespace();
        let word = words.next().unwrap_or_default();
        let args = words.map(str::to_string).collect();
        match Command::lookup(word) {
            Some(command) => Input::Command { command, args },
            None => Input::UnknownCommand(word.to_string()),
        }
    }
}

/// Dispatches inbound text to directives or to a context-carrying chat turn
pub struct CommandRouter {
    provider: Arc<dyn LLMProvider>,
    jokes: Arc<dyn ContentSource>,
    quotes: Arc<dyn ContentSource>,
    history_window: Option<usize>,
}

impl CommandRouter {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        jokes: Arc<dyn ContentSource>,
        quotes: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            provider,
            jokes,
            quotes,
            history_window: None,
        }
    }

    /// Keep at most `window` entries per counterparty after each turn
    pub fn with_history_window(mut self, window: Option<usize>) -> Self {
        self.history_window = window.filter(|w| *w > 0);
        self
    }

    /// Produce the reply for one inbound text. Adapter failures become fixed
    /// fallback replies, so this never fails.
    pub async fn route(&self, store: &ConversationStore, counterparty: &str, text: &str) -> String {
        match Input::parse(text) {
            Input::Command { command, args } => {
                debug!("Command {:?} from {} (args: {:?})", command, counterparty, args);
                self.run_command(command, store, counterparty).await
            }
            Input::UnknownCommand(word) => {
                debug!("Unknown command '{}' from {}", word, counterparty);
                UNKNOWN_COMMAND_REPLY.to_string()
            }
            Input::FreeForm(text) => self.converse(store, counterparty, &text).await,
        }
    }

    async fn run_command(
        &self,
        command: Command,
        store: &ConversationStore,
        counterparty: &str,
    ) -> String {
        match command {
            Command::Help => HELP_TEXT.to_string(),
            Command::Joke => fetch_or(self.jokes.as_ref(), JOKE_FALLBACK).await,
            Command::Quote => fetch_or(self.quotes.as_ref(), QUOTE_FALLBACK).await,
            Command::Reset => {
                store.reset(counterparty).await;
                info!("Conversation history reset for {}", counterparty);
                RESET_REPLY.to_string()
            }
        }
    }

    async fn converse(&self, store: &ConversationStore, counterparty: &str, text: &str) -> String {
        // Held across the completion call so turns for one counterparty never interleave
        let conversation = store.conversation(counterparty);
        let mut conversation = conversation.lock().await;

        let messages = build_messages(conversation.entries(), text);
        debug!(
            "Chat turn for {} with {} messages",
            counterparty,
            messages.len()
        );

        match self
            .provider
            .chat(messages, None, None, None)
            .await
        {
            Ok(response) => {
                conversation.push(ConversationEntry::user(text));
                conversation.push(ConversationEntry::assistant(response.content.clone()));
                if let Some(window) = self.history_window {
                    let dropped = conversation.trim_to(window);
                    if dropped > 0 {
                        debug!("Dropped {} old entries for {}", dropped, counterparty);
                    }
                }
                response.content
            }
            Err(e) => {
                warn!("Chat completion failed for {}: {}", counterparty, e);
                CHAT_FALLBACK.to_string()
            }
        }
    }
}

async fn fetch_or(source: &dyn ContentSource, fallback: &str) -> String {
    match source.fetch().await {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to fetch {}: {}", source.name(), e);
            fallback.to_string()
        }
    }
}
