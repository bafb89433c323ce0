use std::sync::Arc;
use std::time::Duration;

use chatbridge_core::config::GatewayConfig;

use crate::registry::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    /// Public base URL used to build links
    pub base_url: String,
    /// Upper bound on how long a QR request waits for a credential
    pub qr_wait: Duration,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>, gateway: &GatewayConfig) -> Self {
        Self {
            registry,
            base_url: gateway.public_base_url(),
            qr_wait: gateway.qr_wait(),
        }
    }
}
