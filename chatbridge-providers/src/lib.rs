//! Service adapters for chatbridge
//!
//! This crate wraps the external HTTP services a bot talks to: an
//! OpenAI-compatible chat completion endpoint and the joke/quote APIs.

pub mod base;
pub mod content;
pub mod openai;

pub use base::{ContentSource, LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
pub use content::{content_sources, JokeClient, QuoteClient};
pub use openai::OpenAiClient;
