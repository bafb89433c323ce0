//! Per-counterparty message queues for one bot session

use chatbridge_agent::CommandRouter;
use chatbridge_channels::SessionTransport;
use chatbridge_core::bus::InboundMessage;
use chatbridge_core::conversation::ConversationStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// A worker with nothing queued for this long exits
pub const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// The session's live transport, replaced on every reconnect
pub type TransportSlot = Arc<parking_lot::RwLock<Option<Arc<dyn SessionTransport>>>>;

struct Queue {
    id: u64,
    tx: mpsc::UnboundedSender<InboundMessage>,
}

/// Feeds each counterparty's messages to a dedicated worker, so replies to
/// one counterparty go out in arrival order while counterparties proceed
/// independently.
///
/// Replies go through whichever transport is live when they are ready.
pub struct Dispatcher {
    session: String,
    router: Arc<CommandRouter>,
    store: Arc<ConversationStore>,
    transport: TransportSlot,
    queues: parking_lot::Mutex<HashMap<String, Queue>>,
    next_id: AtomicU64,
    idle_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        session: impl Into<String>,
        router: Arc<CommandRouter>,
        store: Arc<ConversationStore>,
        transport: TransportSlot,
    ) -> Self {
        Self {
            session: session.into(),
            router,
            store,
            transport,
            queues: parking_lot::Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            idle_timeout: WORKER_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Reply text for one inbound text; never fails
    pub async fn respond(&self, counterparty: &str, text: &str) -> String {
        self.router.route(&self.store, counterparty, text).await
    }

    /// Queue a message behind earlier ones from the same counterparty
    pub fn enqueue(self: &Arc<Self>, mut message: InboundMessage) {
        let key = message.conversation_key();

        let mut queues = self.queues.lock();
        if let Some(queue) = queues.get(&key) {
            match queue.tx.send(message) {
                Ok(()) => return,
                // Worker is gone; start a new one below
                Err(mpsc::error::SendError(returned)) => message = returned,
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(message);
        queues.insert(key.clone(), Queue { id, tx });
        debug!("[{}] Started worker for {}", self.session, key);
        tokio::spawn(Arc::clone(self).worker(key, id, rx));
    }

    async fn worker(
        self: Arc<Self>,
        key: String,
        id: u64,
        mut rx: mpsc::UnboundedReceiver<InboundMessage>,
    ) {
        loop {
            let message = match tokio::time::timeout(self.idle_timeout, rx.recv()).await {
                Ok(Some(message)) => message,
                Ok(None) => return,
                Err(_) => match self.retire(&key, id, &mut rx) {
                    Some(message) => message,
                    None => return,
                },
            };
            self.deliver(message).await;
        }
    }

    /// Unregister an idle worker. Returns a message that slipped in before
    /// the queue lock was taken, in which case the worker keeps going.
    fn retire(
        &self,
        key: &str,
        id: u64,
        rx: &mut mpsc::UnboundedReceiver<InboundMessage>,
    ) -> Option<InboundMessage> {
        let mut queues = self.queues.lock();
        if let Ok(message) = rx.try_recv() {
            return Some(message);
        }
        if queues.get(key).is_some_and(|queue| queue.id == id) {
            queues.remove(key);
        }
        debug!("[{}] Worker for {} idle, stopping", self.session, key);
        None
    }

    async fn deliver(&self, message: InboundMessage) {
        let reply = self.respond(&message.sender_id, &message.content).await;

        let transport = self.transport.read().clone();
        let Some(transport) = transport else {
            warn!(
                "[{}] No live transport, dropping reply to {}",
                self.session, message.chat_id
            );
            return;
        };
        if let Err(e) = transport.send(message.reply(reply)).await {
            error!(
                "[{}] Failed to send reply to {}: {}",
                self.session, message.chat_id, e
            );
        }
    }

    /// Number of counterparties with a live worker
    pub fn active_queues(&self) -> usize {
        self.queues.lock().len()
    }

    /// Drop all queues; workers finish what they hold and exit
    pub fn shutdown(&self) {
        self.queues.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatbridge_channels::EventSender;
    use chatbridge_core::bus::OutboundMessage;
    use chatbridge_providers::{ContentSource, LLMProvider, LLMResponse, Message, ProviderResult};
    use std::time::Duration;

    /// Echoes the last user message; earlier messages take longer
    struct SlowEcho;

    #[async_trait]
    impl LLMProvider for SlowEcho {
        async fn chat(
            &self,
            messages: Vec<Message>,
            _model: Option<String>,
            _max_tokens: Option<u32>,
            _temperature: Option<f32>,
        ) -> ProviderResult<LLMResponse> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            let delay = 60u64.saturating_sub(messages.len() as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(LLMResponse::new(format!("echo: {}", last)))
        }

        fn get_default_model(&self) -> String {
            "echo".to_string()
        }
    }

    struct Nothing;

    #[async_trait]
    impl ContentSource for Nothing {
        async fn fetch(&self) -> ProviderResult<String> {
            Ok(String::new())
        }

        fn name(&self) -> &str {
            "nothing"
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: parking_lot::Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl SessionTransport for RecordingTransport {
        fn session(&self) -> &str {
            "bot1"
        }

        async fn connect(&self, _events: EventSender) -> chatbridge_channels::Result<()> {
            Ok(())
        }

        async fn send(&self, message: OutboundMessage) -> chatbridge_channels::Result<()> {
            self.sent.lock().push(message);
            Ok(())
        }

        async fn close(&self) -> chatbridge_channels::Result<()> {
            Ok(())
        }
    }

    fn dispatcher_with(transport: Arc<RecordingTransport>, idle_timeout: Duration) -> Arc<Dispatcher> {
        let router = CommandRouter::new(Arc::new(SlowEcho), Arc::new(Nothing), Arc::new(Nothing));
        let live: Arc<dyn SessionTransport> = transport;
        let slot: TransportSlot = Arc::new(parking_lot::RwLock::new(Some(live)));
        Arc::new(
            Dispatcher::new(
                "bot1",
                Arc::new(router),
                Arc::new(ConversationStore::new()),
                slot,
            )
            .with_idle_timeout(idle_timeout),
        )
    }

    fn dispatcher(transport: Arc<RecordingTransport>) -> Arc<Dispatcher> {
        dispatcher_with(transport, WORKER_IDLE_TIMEOUT)
    }

    fn message(from: &str, text: &str) -> InboundMessage {
        InboundMessage::new("bot1", from, format!("{}@s.whatsapp.net", from), text)
    }

    async fn eventually<F: Fn() -> bool>(check: F) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    async fn wait_for_sent(transport: &RecordingTransport, count: usize) {
        for _ in 0..200 {
            if transport.sent.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} replies", count);
    }

    #[tokio::test]
    async fn test_replies_keep_arrival_order() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(transport.clone());

        for i in 1..=4 {
            dispatcher.enqueue(message("555", &format!("m{}", i)));
        }

        wait_for_sent(&transport, 4).await;
        let replies: Vec<String> = transport.sent.lock().iter().map(|m| m.content.clone()).collect();
        assert_eq!(replies, vec!["echo: m1", "echo: m2", "echo: m3", "echo: m4"]);
        assert_eq!(dispatcher.active_queues(), 1);
    }

    #[tokio::test]
    async fn test_one_queue_per_counterparty() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(transport.clone());

        for who in ["555", "777", "555"] {
            dispatcher.enqueue(message(who, "hi"));
        }

        wait_for_sent(&transport, 3).await;
        assert_eq!(dispatcher.active_queues(), 2);
        assert!(transport
            .sent
            .lock()
            .iter()
            .any(|m| m.chat_id == "777@s.whatsapp.net"));

        dispatcher.shutdown();
        assert_eq!(dispatcher.active_queues(), 0);
    }

    #[tokio::test]
    async fn test_idle_workers_exit() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher_with(transport.clone(), Duration::from_millis(50));

        for i in 0..20 {
            dispatcher.enqueue(message(&format!("{}", 1000 + i), "!help"));
        }
        wait_for_sent(&transport, 20).await;

        eventually(|| dispatcher.active_queues() == 0).await;
        eventually(|| Arc::strong_count(&dispatcher) == 1).await;

        dispatcher.enqueue(message("1000", "again"));
        wait_for_sent(&transport, 21).await;
        assert_eq!(transport.sent.lock()[20].content, "echo: again");
    }

    #[tokio::test]
    async fn test_reply_uses_transport_live_at_send_time() {
        let old = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(old.clone());

        dispatcher.enqueue(message("555", "slow"));
        let fresh = Arc::new(RecordingTransport::default());
        let live: Arc<dyn SessionTransport> = fresh.clone();
        *dispatcher.transport.write() = Some(live);

        wait_for_sent(&fresh, 1).await;
        assert_eq!(fresh.sent.lock()[0].content, "echo: slow");
        assert!(old.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_reply_dropped_without_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(transport.clone());
        dispatcher.transport.write().take();

        dispatcher.enqueue(message("555", "hi"));
        eventually(|| dispatcher.store.len() == 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_respond_routes_commands() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(transport);
        assert_eq!(
            dispatcher.respond("555", "!reset").await,
            "Conversation history has been reset."
        );
    }
}
