//! Base traits for chat completion and content providers

use async_trait::async_trait;
use chatbridge_core::conversation::{ConversationEntry, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<ProviderError> for chatbridge_core::Error {
    fn from(e: ProviderError) -> Self {
        chatbridge_core::Error::Provider(e.to_string())
    }
}

/// Response from a chat completion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Reply text, already trimmed and non-empty
    pub content: String,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: HashMap<String, i64>,
}

fn default_finish_reason() -> String {
    "stop".to_string()
}

impl LLMResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: default_finish_reason(),
            usage: HashMap::new(),
        }
    }
}

/// A message in the chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

impl From<&ConversationEntry> for Message {
    fn from(entry: &ConversationEntry) -> Self {
        match entry.role {
            Role::User => Message::user(entry.content.clone()),
            Role::Assistant => Message::assistant(entry.content.clone()),
        }
    }
}

/// Trait for chat completion providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// `None` for `max_tokens` or `temperature` leaves the field out of the
    /// request so the service default applies.
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> ProviderResult<LLMResponse>;

    /// Get the default model for this provider
    fn get_default_model(&self) -> String;
}

/// Trait for single-shot text content services (jokes, quotes)
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch one piece of content already formatted for a chat reply
    async fn fetch(&self) -> ProviderResult<String>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
