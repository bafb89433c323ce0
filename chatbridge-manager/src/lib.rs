//! Session lifecycle, registry and HTTP surface for chatbridge

pub mod backoff;
pub mod dispatcher;
pub mod handlers;
pub mod lifecycle;
pub mod registry;
pub mod render;
pub mod server;
pub mod state;

pub use backoff::ReconnectPolicy;
pub use lifecycle::{SessionController, SessionDeps};
pub use registry::SessionRegistry;
pub use render::{CredentialRenderer, QrServerRenderer};
pub use server::{build_router, run_server};
pub use state::AppState;
