//! Bot session model

pub mod state;
pub mod status;

pub use state::{LifecycleEvent, Session, SessionState};
pub use status::{CredentialImage, SessionStatus};
