//! Scripted collaborators shared by the manager integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chatbridge_agent::CommandRouter;
use chatbridge_channels::{EventSender, SessionEvent, SessionTransport, TransportFactory};
use chatbridge_core::bus::{InboundMessage, OutboundMessage};
use chatbridge_core::session::LifecycleEvent;
use chatbridge_manager::{QrServerRenderer, ReconnectPolicy, SessionDeps, SessionRegistry};
use chatbridge_providers::{ContentSource, LLMProvider, LLMResponse, Message, ProviderResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Transport that emits a fixed script on connect and lets tests push more
pub struct ScriptedTransport {
    session: String,
    script: Vec<SessionEvent>,
    events: Mutex<Option<EventSender>>,
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub closed: AtomicBool,
}

impl ScriptedTransport {
    pub async fn push(&self, event: SessionEvent) {
        let tx = self.events.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    pub async fn push_lifecycle(&self, event: LifecycleEvent) {
        self.push(SessionEvent::Lifecycle(event)).await;
    }

    pub async fn push_message(&self, sender: &str, text: &str) {
        let message = InboundMessage::new(
            self.session.clone(),
            sender,
            format!("{}@s.whatsapp.net", sender),
            text,
        );
        self.push(SessionEvent::Message(message)).await;
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.content.clone()).collect()
    }
}

#[async_trait]
impl SessionTransport for ScriptedTransport {
    fn session(&self) -> &str {
        &self.session
    }

    async fn connect(&self, events: EventSender) -> chatbridge_channels::Result<()> {
        *self.events.lock() = Some(events.clone());
        for event in &self.script {
            let _ = events.send(event.clone()).await;
        }
        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> chatbridge_channels::Result<()> {
        self.sent.lock().push(message);
        Ok(())
    }

    async fn close(&self) -> chatbridge_channels::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.events.lock().take();
        Ok(())
    }
}

/// Hands out scripted transports in order and remembers each one
#[derive(Default)]
pub struct ScriptedFactory {
    scripts: Mutex<VecDeque<Vec<SessionEvent>>>,
    created: Mutex<Vec<Arc<ScriptedTransport>>>,
    creates: AtomicUsize,
}

impl ScriptedFactory {
    pub fn with_scripts(scripts: Vec<Vec<LifecycleEvent>>) -> Self {
        let scripts = scripts
            .into_iter()
            .map(|s| s.into_iter().map(SessionEvent::Lifecycle).collect())
            .collect();
        Self {
            scripts: Mutex::new(scripts),
            ..Default::default()
        }
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn transport(&self, index: usize) -> Arc<ScriptedTransport> {
        self.created.lock()[index].clone()
    }
}

impl TransportFactory for ScriptedFactory {
    fn create(&self, session: &str) -> Arc<dyn SessionTransport> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().pop_front().unwrap_or_default();
        let transport = Arc::new(ScriptedTransport {
            session: session.to_string(),
            script,
            events: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.created.lock().push(transport.clone());
        transport
    }
}

/// Provider that answers with a counter and records every request
#[derive(Default)]
pub struct RecordingProvider {
    pub requests: Mutex<Vec<Vec<Message>>>,
}

#[async_trait]
impl LLMProvider for RecordingProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        _model: Option<String>,
        _max_tokens: Option<u32>,
        _temperature: Option<f32>,
    ) -> ProviderResult<LLMResponse> {
        let mut requests = self.requests.lock();
        requests.push(messages);
        Ok(LLMResponse::new(format!("reply {}", requests.len())))
    }

    fn get_default_model(&self) -> String {
        "recording".to_string()
    }
}

pub struct FixedSource(pub &'static str);

#[async_trait]
impl ContentSource for FixedSource {
    async fn fetch(&self) -> ProviderResult<String> {
        Ok(self.0.to_string())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

pub struct Harness {
    pub factory: Arc<ScriptedFactory>,
    pub provider: Arc<RecordingProvider>,
    pub registry: Arc<SessionRegistry>,
}

pub fn harness(names: &[&str], scripts: Vec<Vec<LifecycleEvent>>) -> Harness {
    let factory = Arc::new(ScriptedFactory::with_scripts(scripts));
    let provider = Arc::new(RecordingProvider::default());
    let router = CommandRouter::new(
        provider.clone(),
        Arc::new(FixedSource("Why did the crab cross the road?\nIt didn't.")),
        Arc::new(FixedSource("\"Stay hungry.\"\n- Someone")),
    );
    let deps = SessionDeps {
        factory: factory.clone(),
        router: Arc::new(router),
        renderer: Arc::new(QrServerRenderer::new("http://qr.test/render", 300)),
        policy: ReconnectPolicy::new(Duration::from_millis(10), Duration::from_millis(50), 2.0),
    };
    let registry = Arc::new(SessionRegistry::new(
        names.iter().map(|n| n.to_string()).collect(),
        deps,
    ));

    Harness {
        factory,
        provider,
        registry,
    }
}

pub fn credential(payload: &str) -> LifecycleEvent {
    LifecycleEvent::CredentialIssued {
        credential: payload.to_string(),
    }
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually<F: Fn() -> bool>(check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
