//! Session lifecycle controller
//!
//! One controller owns one bot session: its state machine, its conversation
//! store, and the single live transport. It supervises the transport in a
//! background task and replaces it with a fresh one after a disconnect.

use chatbridge_agent::CommandRouter;
use chatbridge_channels::{SessionEvent, SessionTransport, TransportFactory};
use chatbridge_core::conversation::{ConversationEntry, ConversationStore};
use chatbridge_core::session::{
    CredentialImage, LifecycleEvent, Session, SessionState, SessionStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::ReconnectPolicy;
use crate::dispatcher::{Dispatcher, TransportSlot};
use crate::render::CredentialRenderer;

const EVENT_BUFFER: usize = 64;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Shared collaborators every controller is built from
#[derive(Clone)]
pub struct SessionDeps {
    pub factory: Arc<dyn TransportFactory>,
    pub router: Arc<CommandRouter>,
    pub renderer: Arc<dyn CredentialRenderer>,
    pub policy: ReconnectPolicy,
}

pub struct SessionController {
    name: String,
    session: parking_lot::RwLock<Session>,
    status_tx: watch::Sender<SessionStatus>,
    store: Arc<ConversationStore>,
    dispatcher: Arc<Dispatcher>,
    factory: Arc<dyn TransportFactory>,
    renderer: Arc<dyn CredentialRenderer>,
    policy: ReconnectPolicy,
    transport: TransportSlot,
    initialized: AtomicBool,
    cancel: CancellationToken,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(name: impl Into<String>, deps: &SessionDeps) -> Self {
        let name = name.into();
        let session = Session::new(name.clone());
        let (status_tx, _) = watch::channel(SessionStatus::from(&session));
        let store = Arc::new(ConversationStore::new());
        let transport: TransportSlot = Arc::new(parking_lot::RwLock::new(None));
        let dispatcher = Arc::new(Dispatcher::new(
            name.clone(),
            deps.router.clone(),
            store.clone(),
            transport.clone(),
        ));

        Self {
            name,
            session: parking_lot::RwLock::new(session),
            status_tx,
            store,
            dispatcher,
            factory: deps.factory.clone(),
            renderer: deps.renderer.clone(),
            policy: deps.policy,
            transport,
            initialized: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            task: parking_lot::Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create the transport and start supervising it. Returns `false` when
    /// the controller was already initialized.
    pub fn initialize(self: &Arc<Self>) -> bool {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        info!("[{}] Initializing session", self.name);
        let transport = self.factory.create(&self.name);
        *self.transport.write() = Some(transport.clone());
        let handle = tokio::spawn(Arc::clone(self).supervise(transport));
        *self.task.lock() = Some(handle);
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.session.read().is_ready()
    }

    pub fn state(&self) -> SessionState {
        self.session.read().state()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus::from(&*self.session.read())
    }

    /// Change notifications; the current value is always the latest status
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub fn current_credential_image(&self) -> CredentialImage {
        let session = self.session.read();
        match session.pairing_credential() {
            Some(credential) => CredentialImage::Available {
                image_url: self.renderer.render(credential),
                issued_at: session.pairing_issued_at(),
            },
            None => CredentialImage::Unavailable,
        }
    }

    /// Reply for one inbound text from `counterparty`
    pub async fn handle_inbound_message(&self, counterparty: &str, text: &str) -> String {
        self.dispatcher.respond(counterparty, text).await
    }

    pub async fn history(&self, counterparty: &str) -> Vec<ConversationEntry> {
        self.store.history(counterparty).await
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.store
    }

    /// Stop supervision and close the live transport
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                warn!("[{}] Supervisor did not stop in time", self.name);
            }
        }

        let transport = self.transport.write().take();
        if let Some(transport) = transport {
            let _ = transport.close().await;
        }
        self.dispatcher.shutdown();
        info!("[{}] Session shut down", self.name);
    }

    /// Feed one lifecycle event through the state machine
    fn apply(&self, event: &LifecycleEvent) -> Option<SessionState> {
        let mut session = self.session.write();
        let previous = session.state();
        match session.apply(event) {
            Some(next) => {
                match event {
                    LifecycleEvent::Disconnected { reason } => {
                        warn!("[{}] {} -> {}: {}", self.name, previous, next, reason)
                    }
                    LifecycleEvent::AuthenticationFailed { message } => warn!(
                        "[{}] {} -> {}: authentication failed: {}",
                        self.name, previous, next, message
                    ),
                    _ => info!("[{}] {} -> {} ({})", self.name, previous, next, event.name()),
                }
                self.status_tx.send_replace(SessionStatus::from(&*session));
                Some(next)
            }
            None => {
                warn!(
                    "[{}] Ignoring {} event in state {}",
                    self.name,
                    event.name(),
                    previous
                );
                None
            }
        }
    }

    fn reinitialize(&self) {
        let mut session = self.session.write();
        if session.reinitialize() {
            info!(
                "[{}] disconnected -> uninitialized (reconnect attempt {})",
                self.name,
                session.reconnect_attempts()
            );
            self.status_tx.send_replace(SessionStatus::from(&*session));
        }
    }

    /// Drive one transport at a time until shutdown
    async fn supervise(self: Arc<Self>, mut transport: Arc<dyn SessionTransport>) {
        loop {
            let reconnect = self.run_transport(&transport).await;
            self.retire_transport(&transport);
            let _ = transport.close().await;
            if !reconnect {
                return;
            }

            let delay = self.policy.delay(self.session.read().reconnect_attempts());
            info!("[{}] Reconnecting in {:?}", self.name, delay);
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            self.reinitialize();
            transport = self.factory.create(&self.name);
            *self.transport.write() = Some(transport.clone());
        }
    }

    /// Stop routing replies to `transport` if it is still the live one
    fn retire_transport(&self, transport: &Arc<dyn SessionTransport>) {
        let mut live = self.transport.write();
        if live.as_ref().is_some_and(|t| Arc::ptr_eq(t, transport)) {
            *live = None;
        }
    }

    /// Process events until the session is disconnected (`true`) or the
    /// controller is shutting down (`false`)
    async fn run_transport(&self, transport: &Arc<dyn SessionTransport>) -> bool {
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        if let Err(e) = transport.connect(tx).await {
            self.apply(&LifecycleEvent::Disconnected {
                reason: e.to_string(),
            });
            return !self.cancel.is_cancelled();
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                event = rx.recv() => match event {
                    Some(SessionEvent::Lifecycle(event)) => {
                        self.apply(&event);
                        if self.state() == SessionState::Disconnected {
                            return true;
                        }
                    }
                    Some(SessionEvent::Message(message)) => {
                        debug!("[{}] Message from {}", self.name, message.sender_id);
                        self.dispatcher.enqueue(message);
                    }
                    None => {
                        self.apply(&LifecycleEvent::Disconnected {
                            reason: "event stream closed".to_string(),
                        });
                        return true;
                    }
                }
            }
        }
    }
}
