//! Registry of named bot sessions

use chatbridge_agent::CommandRouter;
use chatbridge_channels::WhatsAppTransportFactory;
use chatbridge_core::config::Config;
use chatbridge_core::session::{Session, SessionStatus};
use chatbridge_core::{Error, Result};
use chatbridge_providers::{content_sources, OpenAiClient};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::backoff::ReconnectPolicy;
use crate::lifecycle::{SessionController, SessionDeps};
use crate::render::QrServerRenderer;

/// Owns one controller slot per configured session name.
///
/// The key set is fixed at construction. Controllers are created on first
/// access, exactly once per name even under concurrent callers.
pub struct SessionRegistry {
    names: Vec<String>,
    slots: HashMap<String, OnceCell<Arc<SessionController>>>,
    deps: SessionDeps,
}

impl SessionRegistry {
    pub fn new(names: Vec<String>, deps: SessionDeps) -> Self {
        let mut unique = Vec::with_capacity(names.len());
        let mut slots = HashMap::with_capacity(names.len());
        for name in names {
            if !slots.contains_key(&name) {
                slots.insert(name.clone(), OnceCell::new());
                unique.push(name);
            }
        }

        Self {
            names: unique,
            slots,
            deps,
        }
    }

    /// Wire the production collaborators from configuration
    pub fn from_config(config: &Config) -> Self {
        let provider = Arc::new(OpenAiClient::from_config(&config.providers.openai));
        let (jokes, quotes) = content_sources(&config.content);
        let router = CommandRouter::new(provider, Arc::new(jokes), Arc::new(quotes))
            .with_history_window(config.conversation.history_window());

        let deps = SessionDeps {
            factory: Arc::new(WhatsAppTransportFactory::new(&config.bridge)),
            router: Arc::new(router),
            renderer: Arc::new(QrServerRenderer::from_config(&config.renderer)),
            policy: ReconnectPolicy::from_config(&config.reconnect),
        };
        Self::new(config.sessions.names.clone(), deps)
    }

    /// Configured session names, in configuration order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// The controller for `name`, created and initialized on first access
    pub async fn get(&self, name: &str) -> Result<Arc<SessionController>> {
        let slot = self
            .slots
            .get(name)
            .ok_or_else(|| Error::UnknownSession(name.to_string()))?;

        let controller = slot
            .get_or_init(|| async {
                info!("Creating session controller for {}", name);
                let controller = Arc::new(SessionController::new(name, &self.deps));
                controller.initialize();
                controller
            })
            .await;
        Ok(controller.clone())
    }

    /// The controller for `name` if it has been created already
    pub fn peek(&self, name: &str) -> Option<Arc<SessionController>> {
        self.slots.get(name)?.get().cloned()
    }

    /// Create every configured session now
    pub async fn start_all(&self) -> Result<()> {
        for name in &self.names {
            self.get(name).await?;
        }
        Ok(())
    }

    /// Status of one configured session without creating it
    pub fn status(&self, name: &str) -> Result<SessionStatus> {
        if !self.contains(name) {
            return Err(Error::UnknownSession(name.to_string()));
        }
        Ok(match self.peek(name) {
            Some(controller) => controller.status(),
            None => SessionStatus::from(&Session::new(name)),
        })
    }

    /// Status of every configured session; not-yet-created ones report `uninitialized`
    pub fn statuses(&self) -> Vec<SessionStatus> {
        self.names
            .iter()
            .filter_map(|name| self.status(name).ok())
            .collect()
    }

    /// Shut down every created session
    pub async fn shutdown(&self) {
        for name in &self.names {
            if let Some(controller) = self.peek(name) {
                controller.shutdown().await;
            }
        }
    }
}
