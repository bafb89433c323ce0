//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration for chatbridge
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Bot sessions served by this process
    #[serde(default)]
    pub sessions: SessionsConfig,
    /// WhatsApp bridge connection
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Chat completion providers
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Joke and quote services
    #[serde(default)]
    pub content: ContentConfig,
    /// Conversation history policy
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// Reconnect backoff
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Pairing image rendering
    #[serde(default)]
    pub renderer: RendererConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// The fixed set of bot identities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Session names, in display order
    #[serde(default = "default_session_names")]
    pub names: Vec<String>,
    /// Start every session at boot instead of on first access
    #[serde(default)]
    pub eager_start: bool,
}

fn default_session_names() -> Vec<String> {
    (1..=5).map(|i| format!("bot{}", i)).collect()
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            names: default_session_names(),
            eager_start: false,
        }
    }
}

/// WhatsApp bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Base WebSocket URL; each session connects to `{bridge_url}/{name}`
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
    /// Allowed sender ids (empty = allow all)
    #[serde(default)]
    pub allow_from: Vec<String>,
}

fn default_bridge_url() -> String {
    "ws://localhost:3001".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            allow_from: Vec::new(),
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
}

/// An OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Omitted from requests when unset
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Omitted from requests when unset
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Joke and quote endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_joke_url")]
    pub joke_url: String,
    #[serde(default = "default_quote_url")]
    pub quote_url: String,
}

fn default_joke_url() -> String {
    "https://official-joke-api.appspot.com/random_joke".to_string()
}

fn default_quote_url() -> String {
    "https://zenquotes.io/api/random".to_string()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            joke_url: default_joke_url(),
            quote_url: default_quote_url(),
        }
    }
}

/// Conversation history policy
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConversationConfig {
    /// Keep at most this many entries per counterparty (0 = unbounded)
    #[serde(default)]
    pub max_history_messages: usize,
}

impl ConversationConfig {
    pub fn history_window(&self) -> Option<usize> {
        (self.max_history_messages > 0).then_some(self.max_history_messages)
    }
}

/// Exponential backoff between reconnect attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// HTTP gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Externally visible base URL used in generated links; derived from
    /// host and port when empty
    #[serde(default)]
    pub base_url: String,
    /// How long a QR page waits for a pairing credential
    #[serde(default = "default_qr_wait_secs")]
    pub qr_wait_secs: u64,
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_qr_wait_secs() -> u64 {
    30
}

impl GatewayConfig {
    pub fn public_base_url(&self) -> String {
        if self.base_url.trim().is_empty() {
            format!("http://localhost:{}", self.port)
        } else {
            self.base_url.trim_end_matches('/').to_string()
        }
    }

    pub fn qr_wait(&self) -> Duration {
        Duration::from_secs(self.qr_wait_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            base_url: String::new(),
            qr_wait_secs: default_qr_wait_secs(),
        }
    }
}

/// Pairing credential image service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_qr_service_url")]
    pub qr_service_url: String,
    #[serde(default = "default_qr_size")]
    pub size: u32,
}

fn default_qr_service_url() -> String {
    "https://api.qrserver.com/v1/create-qr-code/".to_string()
}

fn default_qr_size() -> u32 {
    300
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            qr_service_url: default_qr_service_url(),
            size: default_qr_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sessions.names, vec!["bot1", "bot2", "bot3", "bot4", "bot5"]);
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.providers.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.conversation.history_window(), None);
    }

    #[test]
    fn test_public_base_url() {
        let mut gateway = GatewayConfig::default();
        assert_eq!(gateway.public_base_url(), "http://localhost:3000");
        gateway.base_url = "https://bots.example.com/".to_string();
        assert_eq!(gateway.public_base_url(), "https://bots.example.com");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"sessions":{"names":["alpha"]},"gateway":{"port":8080}}"#)
                .unwrap();
        assert_eq!(config.sessions.names, vec!["alpha"]);
        assert!(!config.sessions.eager_start);
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.qr_wait_secs, 30);
        assert_eq!(config.reconnect.max_delay_ms, 60_000);
    }
}
