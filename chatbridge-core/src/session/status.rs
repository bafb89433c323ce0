//! Read-only snapshots of a bot session

use super::state::{Session, SessionState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of a session, safe to hand to the HTTP surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub name: String,
    pub state: SessionState,
    pub ready: bool,
    pub has_credential: bool,
    pub pairing_issued_at: Option<DateTime<Utc>>,
    pub last_transition_at: DateTime<Utc>,
    pub last_disconnect_reason: Option<String>,
    pub reconnect_attempts: u32,
}

impl From<&Session> for SessionStatus {
    fn from(session: &Session) -> Self {
        Self {
            name: session.name().to_string(),
            state: session.state(),
            ready: session.is_ready(),
            has_credential: session.pairing_credential().is_some(),
            pairing_issued_at: session.pairing_issued_at(),
            last_transition_at: session.last_transition_at(),
            last_disconnect_reason: session.last_disconnect_reason().map(str::to_string),
            reconnect_attempts: session.reconnect_attempts(),
        }
    }
}

/// What the QR endpoint can show for a session
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialImage {
    Available {
        image_url: String,
        issued_at: Option<DateTime<Utc>>,
    },
    Unavailable,
}

impl CredentialImage {
    pub fn is_available(&self) -> bool {
        matches!(self, CredentialImage::Available { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LifecycleEvent;

    #[test]
    fn test_status_reflects_session() {
        let mut session = Session::new("bot2");
        session.apply(&LifecycleEvent::CredentialIssued {
            credential: "2@xyz".to_string(),
        });

        let status = SessionStatus::from(&session);
        assert_eq!(status.name, "bot2");
        assert_eq!(status.state, SessionState::AwaitingScan);
        assert!(status.has_credential);
        assert!(!status.ready);
    }

    #[test]
    fn test_status_json_hides_credential() {
        let mut session = Session::new("bot2");
        session.apply(&LifecycleEvent::CredentialIssued {
            credential: "secret-payload".to_string(),
        });

        let json = serde_json::to_string(&SessionStatus::from(&session)).unwrap();
        assert!(json.contains("\"state\":\"awaiting_scan\""));
        assert!(!json.contains("secret-payload"));
    }
}
