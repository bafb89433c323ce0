//! Bot session lifecycle state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of one bot session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No network session has reported anything yet
    Uninitialized,
    /// A pairing credential is waiting to be scanned
    AwaitingScan,
    /// Login accepted, client still loading
    Authenticated,
    /// Usable for outbound replies
    Ready,
    /// Connection lost or login rejected; recovery pending
    Disconnected,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::AwaitingScan => "awaiting_scan",
            SessionState::Authenticated => "authenticated",
            SessionState::Ready => "ready",
            SessionState::Disconnected => "disconnected",
        }
    }

    /// Whether the login step is behind us
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated | SessionState::Ready)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle notifications emitted by the underlying network session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    CredentialIssued { credential: String },
    Authenticated,
    Ready,
    Disconnected { reason: String },
    AuthenticationFailed { message: String },
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::CredentialIssued { .. } => "credential_issued",
            LifecycleEvent::Authenticated => "authenticated",
            LifecycleEvent::Ready => "ready",
            LifecycleEvent::Disconnected { .. } => "disconnected",
            LifecycleEvent::AuthenticationFailed { .. } => "authentication_failed",
        }
    }
}

/// One bot identity and its connection bookkeeping.
///
/// State only changes through [`Session::apply`] and
/// [`Session::reinitialize`]; the pairing credential is present exactly
/// while the state is [`SessionState::AwaitingScan`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    name: String,
    state: SessionState,
    #[serde(skip)]
    pairing_credential: Option<String>,
    pairing_issued_at: Option<DateTime<Utc>>,
    last_transition_at: DateTime<Utc>,
    last_disconnect_reason: Option<String>,
    reconnect_attempts: u32,
}

impl Session {
    /// Create a session in the `Uninitialized` state
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: SessionState::Uninitialized,
            pairing_credential: None,
            pairing_issued_at: None,
            last_transition_at: Utc::now(),
            last_disconnect_reason: None,
            reconnect_attempts: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pairing_credential(&self) -> Option<&str> {
        self.pairing_credential.as_deref()
    }

    pub fn pairing_issued_at(&self) -> Option<DateTime<Utc>> {
        self.pairing_issued_at
    }

    pub fn last_transition_at(&self) -> DateTime<Utc> {
        self.last_transition_at
    }

    pub fn last_disconnect_reason(&self) -> Option<&str> {
        self.last_disconnect_reason.as_deref()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Apply a lifecycle event.
    ///
    /// Returns the new state when the event caused a transition and `None`
    /// when the event is not valid in the current state and was ignored.
    pub fn apply(&mut self, event: &LifecycleEvent) -> Option<SessionState> {
        use SessionState::*;

        let next = match (self.state, event) {
            (Uninitialized | AwaitingScan, LifecycleEvent::CredentialIssued { credential }) => {
                self.pairing_credential = Some(credential.clone());
                self.pairing_issued_at = Some(Utc::now());
                AwaitingScan
            }
            (Uninitialized | AwaitingScan, LifecycleEvent::Authenticated) => Authenticated,
            (Authenticated, LifecycleEvent::Ready) => {
                self.reconnect_attempts = 0;
                Ready
            }
            (
                Uninitialized | AwaitingScan | Authenticated | Ready,
                LifecycleEvent::Disconnected { reason },
            ) => {
                self.last_disconnect_reason = Some(reason.clone());
                Disconnected
            }
            (
                Uninitialized | AwaitingScan | Authenticated | Ready,
                LifecycleEvent::AuthenticationFailed { message },
            ) => {
                self.last_disconnect_reason = Some(format!("authentication failed: {}", message));
                Disconnected
            }
            _ => return None,
        };

        self.enter(next);
        Some(next)
    }

    /// `Disconnected -> Uninitialized` when a fresh network session replaces the old one
    pub fn reinitialize(&mut self) -> bool {
        if self.state != SessionState::Disconnected {
            return false;
        }
        self.reconnect_attempts = self.reconnect_attempts.saturating_add(1);
        self.enter(SessionState::Uninitialized);
        true
    }

    fn enter(&mut self, next: SessionState) {
        if next != SessionState::AwaitingScan {
            self.pairing_credential = None;
        }
        self.state = next;
        self.last_transition_at = Utc::now();
    }

    /// `pairing_credential` is present iff the state is `AwaitingScan`
    pub fn credential_invariant_holds(&self) -> bool {
        self.pairing_credential.is_some() == (self.state == SessionState::AwaitingScan)
    }
}
