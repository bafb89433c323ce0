//! WhatsApp transport
//!
//! Each bot session holds one WebSocket to a Node.js bridge process that
//! speaks the WhatsApp Web protocol. The socket lives at
//! `{bridge_url}/{session}` and carries JSON text frames in both directions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use chatbridge_core::bus::{InboundMessage, OutboundMessage};
use chatbridge_core::config::BridgeConfig;
use chatbridge_core::session::LifecycleEvent;

use crate::base::{
    AllowList, ChannelError, EventSender, Result, SessionEvent, SessionTransport, TransportFactory,
};

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    WsMessage,
>;

/// Frames received from the bridge
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeMessage {
    Message {
        #[serde(default)]
        id: String,
        #[serde(default)]
        sender: String,
        #[serde(default)]
        pn: String,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: Option<i64>,
        #[serde(default, alias = "isGroup")]
        is_group: bool,
    },
    Status {
        status: String,
    },
    Qr {
        qr: String,
    },
    AuthFailure {
        #[serde(default)]
        message: String,
    },
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    Error {
        error: String,
    },
    Sent {
        to: String,
    },
}

/// Send command to the bridge
#[derive(Debug, Clone, Serialize)]
struct SendCommand {
    #[serde(rename = "type")]
    msg_type: String,
    to: String,
    text: String,
}

impl SendCommand {
    fn new(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            msg_type: "send".to_string(),
            to: to.into(),
            text: text.into(),
        }
    }
}

fn lifecycle(event: LifecycleEvent) -> SessionEvent {
    SessionEvent::Lifecycle(event)
}

/// Translate one bridge frame into session events.
///
/// `status: connected` is what a bridge sends when the login step was
/// already satisfied, so it expands to `Authenticated` followed by `Ready`.
fn parse_bridge_message(session: &str, raw: &str, allow: &AllowList) -> Vec<SessionEvent> {
    let data: BridgeMessage = match serde_json::from_str(raw) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(
                "[{}] Invalid JSON from bridge: {} (raw: {})",
                session,
                e,
                chatbridge_core::utils::truncate(raw, 100)
            );
            return Vec::new();
        }
    };

    match data {
        BridgeMessage::Message {
            id,
            sender,
            pn,
            content,
            timestamp,
            is_group,
        } => {
            // Extract sender ID from phone number or sender JID
            let user_id = if !pn.is_empty() { pn } else { sender.clone() };
            let sender_id = user_id.split('@').next().unwrap_or(&user_id).to_string();

            if !allow.is_allowed(&sender_id) {
                info!(
                    "[{}] Dropping message from non-allowlisted sender: {}",
                    session, sender_id
                );
                return Vec::new();
            }
            if content.trim().is_empty() {
                debug!("[{}] Ignoring empty message from {}", session, sender_id);
                return Vec::new();
            }

            debug!("[{}] Received message from {}", session, sender_id);

            // Full JID is the reply address
            let mut msg = InboundMessage::new(session, sender_id, sender, content)
                .with_metadata("is_group", is_group);
            if !id.is_empty() {
                msg = msg.with_metadata("message_id", id);
            }
            if let Some(ts) = timestamp {
                msg = msg.with_metadata("timestamp", ts);
                if let Some(at) = DateTime::<Utc>::from_timestamp(ts, 0) {
                    msg.timestamp = at;
                }
            }
            vec![SessionEvent::Message(msg)]
        }
        BridgeMessage::Status { status } => match status.as_str() {
            "authenticated" => vec![lifecycle(LifecycleEvent::Authenticated)],
            "ready" => vec![lifecycle(LifecycleEvent::Ready)],
            "connected" => vec![
                lifecycle(LifecycleEvent::Authenticated),
                lifecycle(LifecycleEvent::Ready),
            ],
            "disconnected" => vec![lifecycle(LifecycleEvent::Disconnected {
                reason: "bridge reported disconnected".to_string(),
            })],
            other => {
                debug!("[{}] Ignoring bridge status '{}'", session, other);
                Vec::new()
            }
        },
        BridgeMessage::Qr { qr } => vec![lifecycle(LifecycleEvent::CredentialIssued {
            credential: qr,
        })],
        BridgeMessage::AuthFailure { message } => {
            vec![lifecycle(LifecycleEvent::AuthenticationFailed { message })]
        }
        BridgeMessage::Disconnected { reason } => {
            vec![lifecycle(LifecycleEvent::Disconnected { reason })]
        }
        BridgeMessage::Error { error } => {
            error!("[{}] WhatsApp bridge error: {}", session, error);
            Vec::new()
        }
        BridgeMessage::Sent { to } => {
            debug!("[{}] Message sent to: {}", session, to);
            Vec::new()
        }
    }
}

/// WebSocket connection to the bridge for one bot session
pub struct WhatsAppTransport {
    session: String,
    url: String,
    allow: AllowList,
    /// WebSocket write stream
    ws_tx: Arc<RwLock<Option<WsSink>>>,
    /// Connection state
    connected: Arc<RwLock<bool>>,
    /// Background reader task
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl WhatsAppTransport {
    pub fn new(session: impl Into<String>, url: impl Into<String>, allow: AllowList) -> Self {
        Self {
            session: session.into(),
            url: url.into(),
            allow,
            ws_tx: Arc::new(RwLock::new(None)),
            connected: Arc::new(RwLock::new(false)),
            task: parking_lot::Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Read frames until the socket ends, then report why
    async fn connection_task(
        session: String,
        url: String,
        allow: AllowList,
        ws_tx: Arc<RwLock<Option<WsSink>>>,
        connected: Arc<RwLock<bool>>,
        events: EventSender,
    ) {
        info!("[{}] Connecting to WhatsApp bridge at {}...", session, url);

        let reason = match connect_async(url.as_str()).await {
            Ok((ws_stream, _)) => {
                info!("[{}] Connected to WhatsApp bridge", session);
                let (write, mut read) = ws_stream.split();
                *ws_tx.write().await = Some(write);
                *connected.write().await = true;

                let reason = 'read: loop {
                    match read.next().await {
                        Some(Ok(WsMessage::Text(text))) => {
                            for event in parse_bridge_message(&session, &text, &allow) {
                                if events.send(event).await.is_err() {
                                    break 'read "session owner went away".to_string();
                                }
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            break "bridge closed the connection".to_string();
                        }
                        Some(Err(e)) => {
                            break format!("websocket error: {}", e);
                        }
                        _ => {}
                    }
                };

                *connected.write().await = false;
                *ws_tx.write().await = None;
                reason
            }
            Err(e) => format!("failed to connect to bridge: {}", e),
        };

        warn!("[{}] WhatsApp connection ended: {}", session, reason);
        let _ = events
            .send(lifecycle(LifecycleEvent::Disconnected { reason }))
            .await;
    }
}

#[async_trait]
impl SessionTransport for WhatsAppTransport {
    fn session(&self) -> &str {
        &self.session
    }

    async fn connect(&self, events: EventSender) -> Result<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Err(ChannelError::Error(format!(
                "transport for {} already connected",
                self.session
            )));
        }

        *task = Some(tokio::spawn(Self::connection_task(
            self.session.clone(),
            self.url.clone(),
            self.allow.clone(),
            self.ws_tx.clone(),
            self.connected.clone(),
            events,
        )));
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<()> {
        if !*self.connected.read().await {
            return Err(ChannelError::NotRunning(format!(
                "WhatsApp bridge not connected for {}",
                self.session
            )));
        }

        let cmd = SendCommand::new(&msg.chat_id, &msg.content);
        let payload = serde_json::to_string(&cmd)
            .map_err(|e| ChannelError::SendFailed(format!("Failed to serialize message: {}", e)))?;

        let mut tx = self.ws_tx.write().await;
        match tx.as_mut() {
            Some(write) => write
                .send(WsMessage::Text(payload))
                .await
                .map_err(|e| ChannelError::SendFailed(e.to_string())),
            None => Err(ChannelError::NotRunning(
                "WebSocket not initialized".to_string(),
            )),
        }
    }

    async fn close(&self) -> Result<()> {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
        }

        if let Some(mut write) = self.ws_tx.write().await.take() {
            let _ = write.close().await;
        }
        *self.connected.write().await = false;

        debug!("[{}] WhatsApp transport closed", self.session);
        Ok(())
    }
}

/// Creates one [`WhatsAppTransport`] per session, addressed at `{bridge_url}/{session}`
#[derive(Debug, Clone)]
pub struct WhatsAppTransportFactory {
    bridge_url: String,
    allow: AllowList,
}

impl WhatsAppTransportFactory {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            bridge_url: config.bridge_url.trim_end_matches('/').to_string(),
            allow: AllowList::new(config.allow_from.clone()),
        }
    }

    pub fn session_url(&self, session: &str) -> String {
        format!("{}/{}", self.bridge_url, session)
    }
}

impl TransportFactory for WhatsAppTransportFactory {
    fn create(&self, session: &str) -> Arc<dyn SessionTransport> {
        Arc::new(WhatsAppTransport::new(
            session,
            self.session_url(session),
            self.allow.clone(),
        ))
    }
}
